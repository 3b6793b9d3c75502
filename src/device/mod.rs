pub mod bus;
pub mod interrupt_line;
pub mod pci;
pub mod scsi;
