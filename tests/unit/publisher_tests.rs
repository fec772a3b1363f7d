//! Incremental publisher sequencing.

use exchange_rs::prelude::*;

fn add(order_id: OrderId, price: Price) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Add,
        order_id,
        ticker_id: 0,
        side: Side::Buy,
        price,
        qty: 1,
        priority: 1,
    }
}

#[test]
fn stamps_a_strict_monotone_sequence_from_one() {
    let (mut update_tx, update_rx) = spsc_channel::<MarketUpdate>(64);
    let (feed_tx, mut feed_rx) = spsc_channel::<SequencedUpdate>(64);

    let mut publisher = MarketDataPublisher::new(
        "233.252.14.3:20001".parse().unwrap(),
        update_rx,
        feed_tx,
    )
    .expect("multicast sender");

    for oid in 1..=3 {
        update_tx.push(add(oid, 100 + oid as Price));
    }
    publisher.poll();

    // The tee into the synthesizer feed carries exactly what went on the
    // wire: gapless sequence numbers starting at 1.
    let teed: Vec<SequencedUpdate> = std::iter::from_fn(|| feed_rx.pop()).collect();
    let seqs: Vec<SeqNum> = teed.iter().map(|s| s.seq_number).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(teed[2].update.order_id, 3);

    // A later batch continues the same stream.
    update_tx.push(add(4, 104));
    publisher.poll();
    assert_eq!(feed_rx.pop().unwrap().seq_number, 4);
}
