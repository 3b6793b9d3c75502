//! Shared helpers for the adapter tests.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use mpt3sas::device::{
    bus::Request,
    interrupt_line::InterruptLine,
    pci::{
        constants::mpi2::{offset, wrseq},
        doorbell::{HandshakeMessage, MessageHandler},
        mpt3sas::{AdapterConfig, Mpt3SasController},
        traits::PciDevice,
    },
    scsi::ScsiBus,
};

pub const MEMORY: u32 = 1;

#[derive(Debug, Default)]
pub struct TestInterruptLine {
    level: AtomicBool,
    messages: AtomicUsize,
}

impl TestInterruptLine {
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }

    pub fn messages(&self) -> usize {
        self.messages.load(Ordering::Relaxed)
    }
}

impl InterruptLine for TestInterruptLine {
    fn interrupt(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    fn set_level(&self, asserted: bool) {
        self.level.store(asserted, Ordering::Relaxed);
    }
}

#[derive(Debug, Default, Clone)]
pub struct TestScsiBus {
    pub resets: Arc<AtomicUsize>,
}

impl ScsiBus for TestScsiBus {
    fn reset_all(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }
}

/// Remembers every message and answers with a fixed reply.
#[derive(Debug, Default, Clone)]
pub struct TestHandler {
    pub messages: Arc<Mutex<Vec<HandshakeMessage>>>,
    pub reply: Option<Vec<u16>>,
}

impl MessageHandler for TestHandler {
    fn handle(&mut self, message: &HandshakeMessage) -> Option<Vec<u16>> {
        self.messages.lock().unwrap().push(message.clone());
        self.reply.clone()
    }
}

#[derive(Debug)]
pub struct TestAdapter {
    pub adapter: Mutex<Mpt3SasController>,
    pub line: Arc<TestInterruptLine>,
    pub bus: TestScsiBus,
    pub handler: TestHandler,
}

impl TestAdapter {
    pub fn new(use_msix: bool, reply: Option<Vec<u16>>) -> Self {
        let bus = TestScsiBus::default();
        let handler = TestHandler {
            reply,
            ..TestHandler::default()
        };
        let line = Arc::new(TestInterruptLine::default());
        let config = AdapterConfig {
            use_msix,
            ..AdapterConfig::default()
        };

        let mut controller =
            Mpt3SasController::new(&config, Box::new(bus.clone()), Box::new(handler.clone()));
        controller.connect_irq(line.clone());

        let adapter = Mutex::new(controller);
        adapter.reset();

        Self {
            adapter,
            line,
            bus,
            handler,
        }
    }

    pub fn read(&self, addr: u64) -> u32 {
        self.adapter.read_io(MEMORY, Request::dword(addr)) as u32
    }

    pub fn write(&self, addr: u64, value: u32) {
        self.adapter
            .write_io(MEMORY, Request::dword(addr), u64::from(value));
    }

    pub fn controller(&self) -> std::sync::MutexGuard<'_, Mpt3SasController> {
        self.adapter.lock().unwrap()
    }

    pub fn messages(&self) -> Vec<HandshakeMessage> {
        self.handler.messages.lock().unwrap().clone()
    }

    pub fn scsi_resets(&self) -> usize {
        self.bus.resets.load(Ordering::Relaxed)
    }

    pub fn unlock_diagnostic(&self) {
        self.write(offset::WRITE_SEQUENCE, wrseq::FLUSH_KEY);
        for key in wrseq::KEYS {
            self.write(offset::WRITE_SEQUENCE, key);
        }
    }
}
