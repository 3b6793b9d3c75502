//! Emulation of the LSI SAS3008 host bus adapter.
//!
//! Only the control plane a Fusion-MPT 2.5 driver probes during
//! initialization is implemented: the doorbell handshake, host interrupt
//! status and mask, the diagnostic unlock and adapter reset, and the
//! host-control block size. Request descriptors, reply queues and the
//! scratchpads are accepted and ignored.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, trace, warn};

use crate::device::{
    bus::Request,
    interrupt_line::InterruptLine,
    scsi::{ScsiBus, ScsiTransportBridge},
};

use super::{
    address::PciAddress,
    config_space::{BarInfo, ConfigSpace, ConfigSpaceBuilder},
    constants::{
        config_space::{class, device, subclass, subsystem, vendor},
        mpi2::{doorbell, him, his, ioc_state},
        mpt3sas::{
            bar, msix, sas_address, DEFAULT_HCB_SIZE, DIAGNOSTIC_WINDOW_SIZE, IO_WINDOW_SIZE,
            MEMORY_WINDOW_SIZE, NUM_PORTS, PCI_EXPRESS_CAPABILITY_OFFSET,
        },
    },
    diagnostic::DiagnosticUnlock,
    doorbell::{Doorbell, DoorbellEvent, DoorbellState, MessageHandler},
    error::ProtocolViolation,
    interrupts::{InterruptArbiter, InterruptDelivery},
    registers::{self, Register, Window},
    traits::PciDevice,
};

/// The coarse lifecycle state of the IOC as reported in the doorbell.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IocState {
    Reset = ioc_state::RESET,
    Ready = ioc_state::READY,
    Operational = ioc_state::OPERATIONAL,
    Fault = ioc_state::FAULT,
}

/// Attach-time configuration of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// The SAS address. Derived from the PCI address if `None` or zero.
    pub sas_address: Option<u64>,
    /// Whether the fabric supports MSI-X for this device.
    pub use_msix: bool,
    pub pci_address: PciAddress,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            sas_address: None,
            use_msix: true,
            pci_address: PciAddress::default(),
        }
    }
}

/// The locally assigned SAS address of an adapter at `address`.
#[must_use]
pub const fn derive_sas_address(address: PciAddress) -> u64 {
    (((sas_address::NAA_LOCALLY_ASSIGNED_ID << 24) | sas_address::IEEE_COMPANY_LOCALLY_ASSIGNED)
        << 36)
        | ((address.bus as u64) << 16)
        | ((address.slot as u64) << 8)
        | address.function as u64
}

/// The emulation of a SAS3008 controller.
#[derive(Debug)]
pub struct Mpt3SasController {
    /// The PCI Configuration Space of the controller.
    config_space: ConfigSpace,

    ioc_state: IocState,

    /// Who initialized the IOC, as reported in the doorbell.
    who_init: u8,

    interrupts: InterruptArbiter,

    doorbell: Doorbell,

    diagnostic: DiagnosticUnlock,

    /// Host-control block window size.
    hcb_size: u32,

    sas_address: u64,

    msix_in_use: bool,

    max_devices: u32,

    max_buses: u32,

    /// The SCSI bus with the attached targets.
    scsi_bus: Box<dyn ScsiBus>,
}

impl Mpt3SasController {
    /// Create a new controller.
    ///
    /// The IOC starts out in the `Reset` state. Reset the device to bring it
    /// to `Ready`.
    #[must_use]
    pub fn new(
        config: &AdapterConfig,
        scsi_bus: Box<dyn ScsiBus>,
        handler: Box<dyn MessageHandler>,
    ) -> Self {
        let sas_address = config
            .sas_address
            .filter(|&address| address != 0)
            .unwrap_or_else(|| derive_sas_address(config.pci_address));

        let mut builder = ConfigSpaceBuilder::new(vendor::LSI, device::LSI_SAS3008)
            .class(class::STORAGE, subclass::STORAGE_SCSI, 0)
            .subsystem(vendor::LSI, subsystem::LSI_SAS3008)
            .io_bar(bar::IO, IO_WINDOW_SIZE)
            .mem64_bar(bar::MEMORY, MEMORY_WINDOW_SIZE)
            .mem64_bar(bar::DIAGNOSTIC, DIAGNOSTIC_WINDOW_SIZE);
        if config.use_msix {
            builder = builder.msix_capability(
                msix::CAPABILITY_OFFSET,
                msix::VECTORS,
                bar::MEMORY,
                msix::TABLE_OFFSET as u32,
                bar::MEMORY,
                msix::PBA_OFFSET as u32,
            );
        }
        let config_space = builder
            .pci_express_capability(PCI_EXPRESS_CAPABILITY_OFFSET)
            .config_space();

        let delivery = if config.use_msix {
            InterruptDelivery::Msix {
                vector: msix::VECTOR,
            }
        } else {
            InterruptDelivery::Intx
        };

        let controller = Self {
            config_space,
            ioc_state: IocState::Reset,
            who_init: 0,
            interrupts: InterruptArbiter::new(delivery),
            doorbell: Doorbell::new(handler),
            diagnostic: DiagnosticUnlock::default(),
            hcb_size: 0,
            sas_address,
            msix_in_use: config.use_msix,
            max_devices: NUM_PORTS,
            max_buses: 1,
            scsi_bus,
        };

        info!(
            "SAS3008 at {} with SAS address {sas_address:#018x}, interrupts via {:?}",
            config.pci_address,
            controller.interrupts.delivery()
        );
        controller
    }

    /// Configure the interrupt line for the controller.
    pub fn connect_irq(&mut self, irq: Arc<dyn InterruptLine>) {
        self.interrupts.connect(irq);
    }

    /// The I/O window behind a BAR.
    #[must_use]
    pub fn window(region: u32) -> Option<Window> {
        u8::try_from(region).ok().and_then(Window::from_bar)
    }

    #[must_use]
    pub const fn ioc_state(&self) -> IocState {
        self.ioc_state
    }

    #[must_use]
    pub const fn sas_address(&self) -> u64 {
        self.sas_address
    }

    #[must_use]
    pub const fn msix_in_use(&self) -> bool {
        self.msix_in_use
    }

    #[must_use]
    pub const fn hcb_size(&self) -> u32 {
        self.hcb_size
    }

    #[must_use]
    pub const fn max_devices(&self) -> u32 {
        self.max_devices
    }

    #[must_use]
    pub const fn max_buses(&self) -> u32 {
        self.max_buses
    }

    #[must_use]
    pub const fn interrupt_status(&self) -> u32 {
        self.interrupts.status()
    }

    #[must_use]
    pub const fn interrupt_mask(&self) -> u32 {
        self.interrupts.mask()
    }

    /// Whether the interrupt signal is currently asserted.
    #[must_use]
    pub const fn interrupt_asserted(&self) -> bool {
        self.interrupts.asserted()
    }

    #[must_use]
    pub const fn doorbell_state(&self) -> &DoorbellState {
        self.doorbell.state()
    }

    #[must_use]
    pub const fn reset_key_progress(&self) -> usize {
        self.diagnostic.progress()
    }

    #[must_use]
    pub const fn host_diagnostic(&self) -> u32 {
        self.diagnostic.host_diagnostic()
    }

    /// The face the controller shows to the SCSI layer.
    #[must_use]
    pub const fn transport_bridge(&self) -> ScsiTransportBridge {
        ScsiTransportBridge::new(self.sas_address)
    }

    /// Write to the PCI Configuration Space.
    pub fn write_config(&mut self, req: Request, value: u64) {
        let msix_enabled = self.config_space.msix_enabled();
        self.config_space.write(req, value);
        if self.config_space.msix_enabled() != msix_enabled {
            debug!(
                "guest {} MSI-X",
                if msix_enabled { "disabled" } else { "enabled" }
            );
        }
    }

    /// Read a register in one of the I/O windows.
    pub fn read(&mut self, window: Window, req: Request) -> u64 {
        let value = match registers::decode(window, req) {
            Ok(Some(register)) => match self.read_register(register) {
                Ok(value) => {
                    trace!("read {register} in {window} window -> {value:#x}");
                    value
                }
                Err(violation) => {
                    warn!("{violation}");
                    0
                }
            },
            Ok(None) => {
                debug!("read of unknown offset {:#x} in {window} window", req.addr);
                0
            }
            Err(violation) => {
                warn!("{violation}");
                0
            }
        };
        self.check_invariants();
        u64::from(value)
    }

    /// Write a register in one of the I/O windows.
    pub fn write(&mut self, window: Window, req: Request, value: u64) {
        match registers::decode(window, req) {
            Ok(Some(register)) => {
                trace!("write {register} in {window} window <- {value:#x}");
                if let Err(violation) = self.write_register(register, value as u32) {
                    warn!("{violation}");
                }
            }
            Ok(None) => {
                debug!(
                    "write of {value:#x} to unknown offset {:#x} in {window} window",
                    req.addr
                );
            }
            Err(violation) => warn!("{violation}"),
        }
        self.check_invariants();
    }

    fn read_register(&mut self, register: Register) -> Result<u32, ProtocolViolation> {
        Ok(match register {
            Register::Doorbell => self.read_doorbell(),
            Register::WriteSequence => return Err(ProtocolViolation::WriteOnlyRegister(register)),
            Register::HostDiagnostic => self.diagnostic.host_diagnostic(),
            Register::HostInterruptStatus => self.interrupts.status(),
            Register::HostInterruptMask => self.interrupts.mask(),
            Register::HcbSize => self.hcb_size,
            Register::MsixTable | Register::MsixPba => {
                debug!("{register} is handled by the fabric");
                0
            }
            stub => {
                trace!("{stub} is not implemented, reading zero");
                0
            }
        })
    }

    fn write_register(&mut self, register: Register, value: u32) -> Result<(), ProtocolViolation> {
        match register {
            Register::Doorbell => self.write_doorbell(value)?,
            Register::WriteSequence => self.diagnostic.write_sequence(value)?,
            Register::HostDiagnostic => {
                if self.diagnostic.write_host_diagnostic(value) {
                    self.reset_adapter();
                }
            }
            Register::HostInterruptStatus => self.write_interrupt_status(),
            Register::HostInterruptMask => self.interrupts.set_mask(value & him::WRITABLE),
            Register::HcbSize => self.hcb_size = value,
            Register::MsixTable | Register::MsixPba => {
                debug!("{register} is handled by the fabric");
            }
            stub => trace!("{stub} is not implemented, ignoring write"),
        }
        Ok(())
    }

    fn read_doorbell(&mut self) -> u32 {
        let status = ((u32::from(self.who_init) << doorbell::WHO_INIT_SHIFT)
            & doorbell::WHO_INIT_MASK)
            | self.ioc_state as u32;
        status | self.doorbell.read()
    }

    fn write_doorbell(&mut self, value: u32) -> Result<(), ProtocolViolation> {
        match self.doorbell.write(value)? {
            DoorbellEvent::None => {}
            DoorbellEvent::RaiseInterrupt => self.interrupts.raise(his::DOORBELL_INTERRUPT),
            DoorbellEvent::MessageUnitReset => {
                debug!("message unit reset");
                self.soft_reset();
            }
        }
        Ok(())
    }

    /// Any write to the interrupt status register acknowledges the doorbell
    /// interrupt. The written value does not matter.
    fn write_interrupt_status(&mut self) {
        if self.doorbell.acknowledge() {
            self.interrupts.clear(his::DOORBELL_INTERRUPT);
        } else {
            self.interrupts.reevaluate();
        }
    }

    fn reset_adapter(&mut self) {
        info!("adapter reset through host diagnostic register");
        self.soft_reset();
        self.diagnostic.clear();
        self.hcb_size = DEFAULT_HCB_SIZE;
    }

    /// Reset the IOC and the SCSI bus. Interrupts are masked meanwhile.
    pub fn soft_reset(&mut self) {
        debug!("soft reset");
        let saved_mask = self.interrupts.mask();
        self.interrupts.set_mask(him::RESET);

        self.scsi_bus.reset_all();
        self.doorbell.abandon();
        self.interrupts.clear(u32::MAX);
        self.interrupts.set_mask(saved_mask);

        self.ioc_state = IocState::Ready;
    }

    /// Soft reset plus restoring the device-wide defaults.
    pub fn hard_reset(&mut self) {
        debug!("hard reset");
        self.soft_reset();
        self.interrupts.set_mask(him::RESET);
        self.max_devices = NUM_PORTS;
        self.max_buses = 1;
        self.hcb_size = DEFAULT_HCB_SIZE;
        self.diagnostic.clear();
    }

    fn check_invariants(&mut self) {
        let pending = self.interrupts.status() & his::DOORBELL_INTERRUPT != 0;
        self.doorbell.check_invariants(pending);
    }
}

impl PciDevice for Mutex<Mpt3SasController> {
    fn write_cfg(&self, req: Request, value: u64) {
        self.lock().unwrap().write_config(req, value);
    }

    fn read_cfg(&self, req: Request) -> u64 {
        self.lock().unwrap().config_space.read(req)
    }

    fn write_io(&self, region: u32, req: Request, value: u64) {
        let Some(window) = Mpt3SasController::window(region) else {
            warn!("{}", ProtocolViolation::UnknownRegion(region));
            return;
        };
        self.lock().unwrap().write(window, req, value);
    }

    fn read_io(&self, region: u32, req: Request) -> u64 {
        let Some(window) = Mpt3SasController::window(region) else {
            warn!("{}", ProtocolViolation::UnknownRegion(region));
            return 0;
        };
        self.lock().unwrap().read(window, req)
    }

    fn bar(&self, bar_no: u8) -> Option<BarInfo> {
        self.lock().unwrap().config_space.bar(bar_no)
    }

    fn reset(&self) {
        self.lock().unwrap().hard_reset();
    }
}
