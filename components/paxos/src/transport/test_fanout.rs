use std::net::SocketAddr;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;
use tokio::time::timeout;

use super::*;
use crate::protocol::InstanceIdx;

fn peers(n: u16) -> Vec<SocketAddr> {
    (1..=n)
        .map(|i| format!("127.0.0.1:{}", 7000 + i).parse().unwrap())
        .collect()
}

fn idx(peer: SocketAddr) -> u16 {
    peer.port() - 7000
}

#[tokio::test(flavor = "multi_thread")]
async fn test_majority_stops_at_quorum() {
    let ps = peers(5);

    // peer 4 and 5 never answer in time.
    let call = |peer: SocketAddr| async move {
        if idx(peer) > 3 {
            sleep(Duration::from_secs(30)).await;
        }
        Ok::<bool, TransportError>(true)
    };

    let rst = timeout(
        Duration::from_secs(5),
        fan_out(&ps, call, Majority::new(3, 5, |ok: &bool| *ok)),
    )
    .await
    .expect("majority must not wait for slow peers");

    assert!(rst.reached());
    assert_eq!(3, rst.oks.len());
    assert_eq!(0, rst.failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_majority_gives_up_when_unreachable() {
    let ps = peers(3);

    let call = |peer: SocketAddr| async move {
        match idx(peer) {
            1 => Ok(false),
            2 => Err(TransportError::Closed(peer)),
            _ => {
                sleep(Duration::from_secs(30)).await;
                Ok(true)
            }
        }
    };

    let rst = timeout(
        Duration::from_secs(5),
        fan_out(&ps, call, Majority::new(2, 3, |ok: &bool| *ok)),
    )
    .await
    .expect("one refusal and one failure out of 3 can not reach 2");

    assert!(!rst.reached());
    assert_eq!(1, rst.rejects.len());
    assert_eq!(1, rst.failed);
    assert!(rst.any(|ok| !*ok));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_conclusive() {
    let ps = peers(3);

    let call = |peer: SocketAddr| async move {
        match idx(peer) {
            1 => Ok(None),
            2 => Err(TransportError::Timeout(peer)),
            _ => {
                sleep(Duration::from_millis(20)).await;
                Ok(Some(b"x".to_vec()))
            }
        }
    };
    let got = fan_out(&ps, call, FirstConclusive::default()).await;
    assert_eq!(Some(b"x".to_vec()), got);

    let none = |_peer: SocketAddr| async move { Ok::<Option<Vec<u8>>, TransportError>(None) };
    let got = fan_out(&ps, none, FirstConclusive::default()).await;
    assert_eq!(None, got);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_min_responsive() {
    let ps = peers(3);

    let call = |peer: SocketAddr| async move {
        match idx(peer) {
            1 => Ok(5),
            2 => Ok(7),
            _ => Ok(6),
        }
    };
    assert_eq!(Some(5), fan_out(&ps, call, MinResponsive::default()).await);

    // an unreachable peer does not drag the minimum down.
    let call = |peer: SocketAddr| async move {
        match idx(peer) {
            1 => Ok(5),
            2 => Ok(7),
            _ => Err(TransportError::Closed(peer)),
        }
    };
    assert_eq!(Some(5), fan_out(&ps, call, MinResponsive::default()).await);

    let call = |peer: SocketAddr| async move { Err::<InstanceIdx, _>(TransportError::Closed(peer)) };
    assert_eq!(None, fan_out(&ps, call, MinResponsive::default()).await);

    assert_eq!(None, fan_out(&[], call, MinResponsive::default()).await);
}
