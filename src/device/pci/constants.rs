//! Constants for the emulated PCI devices.

pub mod config_space {
    //! PCI Configuration Space layout and identifiers.

    /// The size of the (legacy) configuration space we emulate.
    pub const SIZE: usize = 0x100;

    pub mod offset {
        pub const VENDOR: usize = 0x00;
        pub const DEVICE: usize = 0x02;
        pub const COMMAND: usize = 0x04;
        pub const STATUS: usize = 0x06;
        pub const REVISION: usize = 0x08;
        pub const PROG_IF: usize = 0x09;
        pub const SUBCLASS: usize = 0x0a;
        pub const CLASS: usize = 0x0b;
        pub const LATENCY_TIMER: usize = 0x0d;
        pub const HEADER_TYPE: usize = 0x0e;
        pub const BAR0: usize = 0x10;
        pub const SUBSYSTEM_VENDOR: usize = 0x2c;
        pub const SUBSYSTEM: usize = 0x2e;
        pub const CAPABILITIES: usize = 0x34;
        pub const INTERRUPT_LINE: usize = 0x3c;
        pub const INTERRUPT_PIN: usize = 0x3d;
    }

    pub mod command {
        pub const IO_SPACE: u16 = 1 << 0;
        pub const MEMORY_SPACE: u16 = 1 << 1;
        pub const BUS_MASTER: u16 = 1 << 2;
        pub const INTX_DISABLE: u16 = 1 << 10;
    }

    pub mod status {
        pub const CAPABILITIES_LIST: u16 = 1 << 4;
    }

    pub mod bar {
        pub const IO_SPACE: u32 = 0x1;
        pub const MEM_TYPE_64: u32 = 0x4;
        pub const IO_ADDRESS_MASK: u32 = !0x3;
        pub const MEM_ADDRESS_MASK: u32 = !0xf;
    }

    pub mod capability {
        pub const ID_PCI_EXPRESS: u8 = 0x10;
        pub const ID_MSIX: u8 = 0x11;

        pub mod msix {
            pub const CONTROL_ENABLE: u16 = 1 << 15;
            pub const CONTROL_FUNCTION_MASK: u16 = 1 << 14;
        }

        pub mod pci_express {
            /// Capability version 2, device/port type "PCI Express Endpoint".
            pub const CAPABILITIES: u16 = 0x0002;
        }
    }

    pub mod vendor {
        pub const LSI: u16 = 0x1000;
    }

    pub mod device {
        pub const LSI_SAS3008: u16 = 0x0097;
    }

    pub mod subsystem {
        pub const LSI_SAS3008: u16 = 0x8000;
    }

    pub mod class {
        pub const STORAGE: u8 = 0x01;
    }

    pub mod subclass {
        pub const STORAGE_SCSI: u8 = 0x00;
    }

    pub const INTERRUPT_PIN_INTA: u8 = 0x01;
}

pub mod mpt3sas {
    //! Layout of the LSI SAS3008 as presented to the guest.

    /// Number of SAS ports and thereby the maximum number of targets.
    pub const NUM_PORTS: u32 = 8;

    /// Size of the PCI window the host-control block size resets to.
    pub const DEFAULT_HCB_SIZE: u32 = 0x40000;

    /// Size of the legacy port I/O window (BAR 0).
    pub const IO_WINDOW_SIZE: u64 = 0x100;

    /// Size of the memory window (BAR 1).
    pub const MEMORY_WINDOW_SIZE: u64 = 0x10000;

    /// Size of the diagnostic window (BAR 3).
    pub const DIAGNOSTIC_WINDOW_SIZE: u64 = 0x10000;

    pub mod bar {
        pub const IO: u8 = 0;
        pub const MEMORY: u8 = 1;
        pub const DIAGNOSTIC: u8 = 3;
    }

    pub mod msix {
        pub const VECTORS: u16 = 15;
        pub const TABLE_OFFSET: u64 = 0x2000;
        pub const TABLE_ENTRY_SIZE: u64 = 16;
        pub const PBA_OFFSET: u64 = 0x3800;
        pub const PBA_SIZE: u64 = 8;
        pub const CAPABILITY_OFFSET: usize = 0x68;
        /// The only vector the controller ever signals.
        pub const VECTOR: u16 = 0;
    }

    pub const PCI_EXPRESS_CAPABILITY_OFFSET: usize = 0xa0;

    pub mod sas_address {
        pub const NAA_LOCALLY_ASSIGNED_ID: u64 = 0x3;
        pub const IEEE_COMPANY_LOCALLY_ASSIGNED: u64 = 0x52_5400;
    }
}

pub mod mpi2 {
    //! Definitions of the Fusion-MPT 2.x system interface.

    pub mod offset {
        pub const DOORBELL: u64 = 0x00;
        pub const WRITE_SEQUENCE: u64 = 0x04;
        pub const HOST_DIAGNOSTIC: u64 = 0x08;
        pub const DIAG_RW_DATA: u64 = 0x10;
        pub const DIAG_RW_ADDRESS_LOW: u64 = 0x14;
        pub const DIAG_RW_ADDRESS_HIGH: u64 = 0x18;
        pub const HOST_INTERRUPT_STATUS: u64 = 0x30;
        pub const HOST_INTERRUPT_MASK: u64 = 0x34;
        pub const DCR_DATA: u64 = 0x38;
        pub const DCR_ADDRESS: u64 = 0x3c;
        pub const REPLY_FREE_HOST_INDEX: u64 = 0x48;
        pub const REPLY_POST_HOST_INDEX: u64 = 0x6c;
        pub const HCB_SIZE: u64 = 0x74;
        pub const HCB_ADDRESS_LOW: u64 = 0x78;
        pub const HCB_ADDRESS_HIGH: u64 = 0x7c;
        pub const SCRATCHPAD0: u64 = 0xb0;
        pub const SCRATCHPAD1: u64 = 0xb4;
        pub const SCRATCHPAD2: u64 = 0xb8;
        pub const SCRATCHPAD3: u64 = 0xbc;
        pub const REQUEST_DESCRIPTOR_POST_LOW: u64 = 0xc0;
        pub const REQUEST_DESCRIPTOR_POST_HIGH: u64 = 0xc4;
        pub const ATOMIC_REQUEST_DESCRIPTOR_POST: u64 = 0xc8;
        pub const SUP_REPLY_POST_HOST_INDEX: u64 = 0x30c;
    }

    pub mod doorbell {
        pub const IOC_STATE_MASK: u32 = 0xf000_0000;
        pub const USED: u32 = 0x0800_0000;
        pub const WHO_INIT_MASK: u32 = 0x0700_0000;
        pub const WHO_INIT_SHIFT: u32 = 24;
        pub const DATA_MASK: u32 = 0x0000_ffff;
        pub const FUNCTION_MASK: u32 = 0xff00_0000;
        pub const FUNCTION_SHIFT: u32 = 24;
        pub const ADD_DWORDS_MASK: u32 = 0x00ff_0000;
        pub const ADD_DWORDS_SHIFT: u32 = 16;
    }

    pub mod ioc_state {
        pub const RESET: u32 = 0x0000_0000;
        pub const READY: u32 = 0x1000_0000;
        pub const OPERATIONAL: u32 = 0x2000_0000;
        pub const FAULT: u32 = 0x4000_0000;
    }

    pub mod function {
        pub const IOC_INIT: u8 = 0x02;
        pub const IOC_FACTS: u8 = 0x03;
        pub const PORT_FACTS: u8 = 0x05;
        pub const IOC_MESSAGE_UNIT_RESET: u8 = 0x40;
        pub const HANDSHAKE: u8 = 0x42;
    }

    /// Host interrupt status bits.
    pub mod his {
        pub const IOC2SYS_DB_STATUS: u32 = 0x0000_0001;
        pub const DOORBELL_INTERRUPT: u32 = IOC2SYS_DB_STATUS;
        pub const REPLY_DESCRIPTOR_INTERRUPT: u32 = 0x0000_0008;
        pub const RESET_IRQ_STATUS: u32 = 0x4000_0000;
        pub const SYS2IOC_DB_STATUS: u32 = 0x8000_0000;
        pub const IOP_DOORBELL_STATUS: u32 = SYS2IOC_DB_STATUS;
    }

    /// Host interrupt mask bits.
    pub mod him {
        pub const IOC2SYS_DB_MASK: u32 = 0x0000_0001;
        pub const DIM: u32 = IOC2SYS_DB_MASK;
        pub const REPLY_INT_MASK: u32 = 0x0000_0008;
        pub const RIM: u32 = REPLY_INT_MASK;
        pub const RESET_IRQ_MASK: u32 = 0x4000_0000;
        /// The bits a guest may set in the mask register.
        pub const WRITABLE: u32 = RIM | DIM | RESET_IRQ_MASK;
        /// The mask in effect while the adapter resets.
        pub const RESET: u32 = RESET_IRQ_MASK | DIM;
    }

    pub mod diag {
        pub const HOLD_IOC_RESET: u32 = 0x0000_0002;
        pub const RESET_ADAPTER: u32 = 0x0000_0004;
        pub const DIAG_RW_ENABLE: u32 = 0x0000_0010;
        pub const RESET_HISTORY: u32 = 0x0000_0020;
        pub const DIAG_WRITE_ENABLE: u32 = 0x0000_0080;
    }

    pub mod wrseq {
        pub const FLUSH_KEY: u32 = 0x0;
        pub const KEYS: [u32; 6] = [0xf, 0x4, 0xb, 0x2, 0x7, 0xd];
    }
}
