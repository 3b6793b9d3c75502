mod common;

use common::TestAdapter;
use mpt3sas::device::pci::{
    constants::mpi2::{doorbell, him, his, ioc_state, offset},
    doorbell::DoorbellState,
};
use proptest::prelude::*;

const fn handshake(dwords: u32) -> u32 {
    0x4200_0000 | (dwords << 16)
}

#[test]
fn message_is_processed_after_the_last_dword() {
    let adapter = TestAdapter::new(false, None);
    adapter.write(offset::HOST_INTERRUPT_MASK, 0);

    adapter.write(offset::DOORBELL, handshake(4));
    assert!(adapter.line.level());
    adapter.write(offset::HOST_INTERRUPT_STATUS, 0);
    assert!(!adapter.line.level());

    for word in 1..=3 {
        adapter.write(offset::DOORBELL, word);
        assert!(adapter.messages().is_empty(), "processed after {word} dwords");
    }
    adapter.write(offset::DOORBELL, 4);

    let messages = adapter.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].words(), &[1, 2, 3, 4]);
    assert_eq!(adapter.controller().doorbell_state(), &DoorbellState::None);
}

#[test]
fn reply_is_read_through_the_doorbell() {
    let adapter = TestAdapter::new(false, Some(vec![0x0300, 0x1000, 0x0006]));
    adapter.write(offset::HOST_INTERRUPT_MASK, 0);

    adapter.write(offset::DOORBELL, handshake(1));
    adapter.write(offset::HOST_INTERRUPT_STATUS, 0);
    adapter.write(offset::DOORBELL, 0x0300_0000);
    assert!(adapter.line.level());

    let ready_used = ioc_state::READY | doorbell::USED;
    let reply: Vec<u32> = (0..3).map(|_| adapter.read(offset::DOORBELL)).collect();
    assert_eq!(
        reply,
        vec![ready_used | 0x0300, ready_used | 0x1000, ready_used | 0x0006]
    );

    // Exhausted, but the handshake only ends with the acknowledgement.
    assert_eq!(adapter.read(offset::DOORBELL), ready_used);
    assert!(matches!(
        adapter.controller().doorbell_state(),
        DoorbellState::Read { index: 3, .. }
    ));

    adapter.write(offset::HOST_INTERRUPT_STATUS, 0);
    assert_eq!(adapter.controller().doorbell_state(), &DoorbellState::None);
    assert_eq!(adapter.read(offset::HOST_INTERRUPT_STATUS), 0);
    assert_eq!(adapter.read(offset::DOORBELL), ioc_state::READY);
    assert!(!adapter.line.level());
}

#[test]
fn masked_doorbell_interrupt_is_still_reported() {
    let adapter = TestAdapter::new(false, None);
    assert_eq!(adapter.read(offset::HOST_INTERRUPT_MASK), him::RESET);

    adapter.write(offset::DOORBELL, handshake(2));
    assert_eq!(
        adapter.read(offset::HOST_INTERRUPT_STATUS),
        his::DOORBELL_INTERRUPT
    );
    assert!(!adapter.line.level());

    adapter.write(offset::HOST_INTERRUPT_MASK, 0);
    assert!(adapter.line.level());
}

#[test]
fn msix_sends_one_message_per_assertion() {
    let adapter = TestAdapter::new(true, None);
    adapter.write(offset::HOST_INTERRUPT_MASK, 0);

    adapter.write(offset::DOORBELL, handshake(2));
    adapter.write(offset::DOORBELL, 0);
    assert_eq!(adapter.line.messages(), 1);

    adapter.write(offset::HOST_INTERRUPT_STATUS, 0);
    adapter.write(offset::DOORBELL, 0);
    adapter.write(offset::DOORBELL, handshake(0));
    assert_eq!(adapter.line.messages(), 2);
    assert!(!adapter.line.level());
}

#[test]
fn message_unit_reset_ends_handshake() {
    let adapter = TestAdapter::new(false, Some(vec![1, 2, 3]));
    adapter.write(offset::DOORBELL, handshake(0));
    assert_eq!(adapter.read(offset::DOORBELL) & doorbell::DATA_MASK, 1);

    adapter.write(offset::DOORBELL, 0x4000_0000);
    assert_eq!(adapter.controller().doorbell_state(), &DoorbellState::None);
    assert_eq!(adapter.read(offset::HOST_INTERRUPT_STATUS), 0);
    assert_eq!(adapter.read(offset::DOORBELL), ioc_state::READY);
    assert_eq!(adapter.scsi_resets(), 2);
}

#[test]
fn message_unit_reset_while_collecting_a_message() {
    let adapter = TestAdapter::new(false, None);
    let resets = adapter.scsi_resets();

    adapter.write(offset::DOORBELL, handshake(4));
    adapter.write(offset::DOORBELL, 0x0300_0000);
    adapter.write(offset::DOORBELL, 0x4000_0000);

    assert_eq!(adapter.controller().doorbell_state(), &DoorbellState::None);
    assert_eq!(adapter.scsi_resets(), resets + 1);
    assert_eq!(adapter.read(offset::HOST_INTERRUPT_STATUS), 0);
    assert_eq!(adapter.read(offset::DOORBELL), ioc_state::READY);
    assert!(adapter.messages().is_empty());

    // The next handshake starts from scratch.
    adapter.write(offset::DOORBELL, handshake(1));
    adapter.write(offset::DOORBELL, 0x0300_0000);
    assert_eq!(adapter.messages().len(), 1);
    assert_eq!(adapter.messages()[0].words(), &[0x0300_0000]);
}

#[test]
fn unsupported_function_is_ignored() {
    let adapter = TestAdapter::new(false, None);
    adapter.write(offset::DOORBELL, 0x0300_0000);
    assert_eq!(adapter.controller().doorbell_state(), &DoorbellState::None);
    assert_eq!(adapter.read(offset::HOST_INTERRUPT_STATUS), 0);
    assert!(adapter.messages().is_empty());
}

proptest! {
    #[test]
    fn message_holds_words_in_write_order(
        words in prop::collection::vec(
            any::<u32>().prop_filter("message unit reset", |word| word >> 24 != 0x40),
            0..=32,
        ),
    ) {
        let adapter = TestAdapter::new(false, None);
        adapter.write(offset::DOORBELL, handshake(words.len() as u32));
        for &word in &words {
            prop_assert!(adapter.messages().is_empty());
            adapter.write(offset::DOORBELL, word);
        }

        let messages = adapter.messages();
        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].words(), &words[..]);
    }
}
