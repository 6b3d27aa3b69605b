use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::conf::ClusterInfo;
use crate::protocol::*;
use crate::testutil::*;
use crate::transport::framed;
use crate::transport::recv_msg;
use crate::transport::send_msg;
use crate::Paxos;
use crate::PaxosConfig;
use crate::PaxosServer;

#[tokio::test(flavor = "multi_thread")]
async fn test_server_closes_conns_on_stop() {
    let lis = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = lis.local_addr().unwrap();

    let conf = PaxosConfig {
        node_id: 1,
        cluster: ClusterInfo::from_nodes(&[(addr, dead_addr())], test_tuning()).unwrap(),
    };
    let paxos = Arc::new(Paxos::new(&conf, new_mem_storage(), &discard_logger()).unwrap());

    let (tx, rx) = oneshot::channel::<()>();
    let j = tokio::spawn(PaxosServer::new(paxos).serve_listener(lis, rx));

    let mut conn = framed(TcpStream::connect(addr).await.unwrap());
    send_msg(&mut conn, &MakeRequest::done()).await.unwrap();
    let rep: Reply = recv_msg(&mut conn).await.unwrap().unwrap();
    assert!(matches!(rep.body, Some(reply::Body::Done(_))), "{:?}", rep);

    tx.send(()).unwrap();
    j.await.unwrap().unwrap();

    // the connection opened before stop is not served any more.
    let _ = send_msg(&mut conn, &MakeRequest::done()).await;
    let rst = timeout(Duration::from_secs(2), recv_msg::<Reply>(&mut conn))
        .await
        .unwrap();
    assert!(!matches!(rst, Ok(Some(_))), "{:?}", rst);

    assert!(TcpStream::connect(addr).await.is_err());
}
