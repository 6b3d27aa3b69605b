use crate::protocol::quorum;

#[test]
fn test_quorum() {
    // n, majority
    let cases: Vec<(usize, usize)> = vec![
        (1, 1),
        (2, 2),
        (3, 2),
        (4, 3),
        (5, 3),
        (6, 4),
        (7, 4),
    ];

    for (n, want) in cases {
        assert_eq!(want, quorum(n), "n={}", n);
    }
}
