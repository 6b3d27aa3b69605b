use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use super::*;
use crate::testutil::dead_addr;
use crate::testutil::discard_logger;

/// start_sink accepts connections and reads from them until they close.
/// It returns its address and a counter of accepted connections.
async fn start_sink() -> (SocketAddr, Arc<AtomicUsize>) {
    let lis = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = lis.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let cnt = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (mut sock, _) = match lis.accept().await {
                Ok(x) => x,
                Err(_) => return,
            };
            cnt.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 64];
                while let Ok(n) = sock.read(&mut buf).await {
                    if n == 0 {
                        return;
                    }
                }
            });
        }
    });

    (addr, accepted)
}

fn new_pool(max: usize, block: bool) -> ConnectionPool {
    ConnectionPool::new(
        PoolConfig {
            max_conns_per_peer: max,
            block_when_exhausted: block,
            acquire_timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_millis(500),
        },
        discard_logger(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_reuses_released_conn() {
    let (addr, accepted) = start_sink().await;
    let pool = new_pool(4, true);

    let c = pool.acquire(addr).await.unwrap();
    assert_eq!(addr, c.peer());
    assert!(!c.reused());
    assert_eq!(0, pool.idle_count(addr));

    pool.release(c, false);
    assert_eq!(1, pool.idle_count(addr));

    let c = pool.acquire(addr).await.unwrap();
    assert!(c.reused());
    assert_eq!(0, pool.idle_count(addr));
    pool.release(c, false);

    assert_eq!(1, accepted.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_drops_failed_conn() {
    let (addr, accepted) = start_sink().await;
    let pool = new_pool(4, true);

    let c = pool.acquire(addr).await.unwrap();
    pool.release(c, true);
    assert_eq!(0, pool.idle_count(addr));

    let c = pool.acquire(addr).await.unwrap();
    pool.release(c, false);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(2, accepted.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_exhausted() {
    let (addr, _) = start_sink().await;

    let pool = new_pool(1, false);
    let c = pool.acquire(addr).await.unwrap();
    let rst = pool.acquire(addr).await;
    assert_eq!(
        TransportError::NoConnectionAvailable(addr),
        rst.err().unwrap()
    );

    // a released slot is usable again.
    pool.release(c, false);
    let c = pool.acquire(addr).await.unwrap();
    pool.release(c, false);

    // blocking mode waits up to acquire_timeout.
    let pool = Arc::new(new_pool(1, true));
    let c = pool.acquire(addr).await.unwrap();
    let rst = pool.acquire(addr).await;
    assert_eq!(
        TransportError::NoConnectionAvailable(addr),
        rst.err().unwrap()
    );

    let p = pool.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        p.release(c, false);
    });
    let c = pool.acquire(addr).await.unwrap();
    pool.release(c, false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_slots_are_per_peer() {
    let (a, _) = start_sink().await;
    let (b, _) = start_sink().await;

    let pool = new_pool(1, false);
    let ca = pool.acquire(a).await.unwrap();
    let cb = pool.acquire(b).await.unwrap();

    pool.release(ca, false);
    pool.release(cb, false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_dead_peer() {
    let addr = dead_addr();
    let pool = new_pool(1, false);

    let rst = pool.acquire(addr).await;
    match rst {
        Err(TransportError::Io(_)) | Err(TransportError::Timeout(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("connected to a dead address"),
    }

    // the failed connect gave its slot back.
    let rst = pool.acquire(addr).await;
    assert!(!matches!(rst, Err(TransportError::NoConnectionAvailable(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_evict_idle() {
    let (addr, accepted) = start_sink().await;
    let pool = new_pool(4, true);

    let c1 = pool.acquire(addr).await.unwrap();
    let c2 = pool.acquire(addr).await.unwrap();
    pool.release(c1, false);
    pool.release(c2, false);
    assert_eq!(2, pool.idle_count(addr));

    assert_eq!(2, pool.evict_idle(addr));
    assert_eq!(0, pool.idle_count(addr));
    assert_eq!(0, pool.evict_idle(addr));

    let c = pool.acquire(addr).await.unwrap();
    assert!(!c.reused());
    pool.release(c, false);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(3, accepted.load(Ordering::SeqCst));
}
