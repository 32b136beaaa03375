//! Raw backend: SMM firmware calls through I/O ports
//!
//! A firmware routine is invoked by loading the register block and writing
//! the command byte to port 0xB2, then 0x84. The firmware answers in the same
//! registers. Only [`PrivilegedPorts`] touches the hardware; the protocol
//! logic above it is written against the [`SmmPort`] seam so it can be
//! driven by a scripted firmware in tests.

use std::fmt;

use tracing::{debug, warn};

use crate::constants::smm;
use crate::data::{AutoControlMethod, FanLevel, FanSide, Temperature};
use crate::hw::ioctl::{checked_fan_level, checked_temperature};
use crate::hw::HardwareBackend;
use tf_error::{Result, ThermfanError};

/// Register block exchanged with the firmware
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmmRegisters {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
}

impl SmmRegisters {
    pub fn command(eax: u32, ebx: u32) -> Self {
        Self { eax, ebx, ..Self::default() }
    }

    /// Result byte of a successful call
    pub fn result(&self) -> u8 {
        (self.eax & 0xff) as u8
    }
}

impl fmt::Display for SmmRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eax={:08x} ebx={:08x} ecx={:08x} edx={:08x} esi={:08x} edi={:08x}",
            self.eax, self.ebx, self.ecx, self.edx, self.esi, self.edi
        )
    }
}

/// Register transport for firmware calls
pub trait SmmPort {
    /// Execute one call in place; returns the carry flag after the call.
    fn invoke(&mut self, regs: &mut SmmRegisters) -> Result<bool>;
}

/// Judge a completed call by the firmware's failure conventions
pub fn check_response(command: u32, regs: &SmmRegisters, carry: bool) -> Result<()> {
    if carry || regs.eax & smm::FAILURE_SENTINEL == smm::FAILURE_SENTINEL || regs.eax == command {
        return Err(ThermfanError::FirmwareCall { command, eax: regs.eax, carry });
    }
    Ok(())
}

/// Exclusive grant of the two SMM ports, revoked on drop
#[derive(Debug)]
pub struct PrivilegedPorts {
    _private: (),
}

#[cfg(all(target_os = "linux", target_env = "gnu", target_arch = "x86_64"))]
impl PrivilegedPorts {
    pub fn acquire() -> Result<Self> {
        for port in [smm::COMMAND_PORT, smm::DATA_PORT] {
            // SAFETY: ioperm only changes this process's I/O permission bitmap
            let rc = unsafe { libc::ioperm(port as libc::c_ulong, 1, 1) };
            if rc != 0 {
                let source = std::io::Error::last_os_error();
                Self::release();
                return Err(ThermfanError::PortAccess { port, source });
            }
        }
        debug!(command = smm::COMMAND_PORT, data = smm::DATA_PORT, "I/O port access granted");
        Ok(Self { _private: () })
    }

    fn release() {
        for port in [smm::COMMAND_PORT, smm::DATA_PORT] {
            // SAFETY: revoking access is always sound
            unsafe {
                libc::ioperm(port as libc::c_ulong, 1, 0);
            }
        }
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu", target_arch = "x86_64")))]
impl PrivilegedPorts {
    pub fn acquire() -> Result<Self> {
        Err(ThermfanError::not_supported("SMM port access requires Linux on x86_64"))
    }

    fn release() {}
}

impl Drop for PrivilegedPorts {
    fn drop(&mut self) {
        Self::release();
    }
}

impl SmmPort for PrivilegedPorts {
    fn invoke(&mut self, regs: &mut SmmRegisters) -> Result<bool> {
        // SAFETY: a PrivilegedPorts value only exists after both ports were
        // granted, and SmmBackend issues calls only after the signature check.
        unsafe { raw_smm_call(regs) }
    }
}

/// Trigger the firmware with the given register block.
///
/// # Safety
///
/// The caller must hold I/O permission for ports 0xB2 and 0x84 and must have
/// verified the vendor signature; on other hardware these ports may do
/// anything.
#[cfg(target_arch = "x86_64")]
unsafe fn raw_smm_call(regs: &mut SmmRegisters) -> Result<bool> {
    use core::arch::asm;

    // rbx is reserved by LLVM, so ebx travels through a scratch register
    let mut rbx = regs.ebx as u64;
    let carry: u8;
    asm!(
        "xchg {bx}, rbx",
        "out 0xb2, al",
        "out 0x84, al",
        "setc {cf}",
        "xchg {bx}, rbx",
        bx = inout(reg) rbx,
        cf = out(reg_byte) carry,
        inout("eax") regs.eax,
        inout("ecx") regs.ecx,
        inout("edx") regs.edx,
        inout("esi") regs.esi,
        inout("edi") regs.edi,
        options(nostack),
    );
    regs.ebx = rbx as u32;
    Ok(carry != 0)
}

#[cfg(not(target_arch = "x86_64"))]
unsafe fn raw_smm_call(_regs: &mut SmmRegisters) -> Result<bool> {
    Err(ThermfanError::not_supported("SMM calls are only implemented for x86_64"))
}

/// Fan control through direct firmware calls
pub struct SmmBackend<P: SmmPort = PrivilegedPorts> {
    port: P,
    method: AutoControlMethod,
}

impl SmmBackend<PrivilegedPorts> {
    /// Grant the ports and verify this is a supported machine
    pub fn open() -> Result<Self> {
        Self::with_port(PrivilegedPorts::acquire()?)
    }
}

impl<P: SmmPort> SmmBackend<P> {
    pub fn with_port(port: P) -> Result<Self> {
        let mut backend = Self { port, method: AutoControlMethod::Method1 };
        backend.verify_signature()?;
        Ok(backend)
    }

    /// Command pair used by [`HardwareBackend::set_firmware_auto_control`]
    pub fn with_auto_control(mut self, method: AutoControlMethod) -> Self {
        self.method = method;
        self
    }

    pub fn auto_control_method(&self) -> AutoControlMethod {
        self.method
    }

    /// Issue one checked call
    fn call(&mut self, eax: u32, ebx: u32) -> Result<SmmRegisters> {
        let mut regs = SmmRegisters::command(eax, ebx);
        let carry = self.port.invoke(&mut regs)?;
        check_response(eax, &regs, carry)?;
        Ok(regs)
    }

    fn verify_signature(&mut self) -> Result<()> {
        let mut last = (0, 0);
        for command in [smm::GET_SIGNATURE_1, smm::GET_SIGNATURE_2] {
            let mut regs = SmmRegisters::command(command, 0);
            let carry = self.port.invoke(&mut regs)?;
            if !carry && regs.eax == smm::SIGNATURE_EAX && regs.edx == smm::SIGNATURE_EDX {
                debug!(command = %format!("{:#06x}", command), "Firmware signature verified");
                return Ok(());
            }
            debug!(command = %format!("{:#06x}", command), %regs, "Signature command did not match");
            last = (regs.eax, regs.edx);
        }
        warn!("Firmware did not identify as a supported machine");
        Err(ThermfanError::SignatureMismatch { eax: last.0, edx: last.1 })
    }
}

impl<P: SmmPort> HardwareBackend for SmmBackend<P> {
    fn name(&self) -> &'static str {
        "smm"
    }

    fn read_temperature(&mut self) -> Result<Temperature> {
        let regs = self.call(smm::GET_TEMP, smm::CPU_SENSOR)?;
        checked_temperature(regs.result() as i64)
    }

    fn read_fan(&mut self, side: FanSide) -> Result<FanLevel> {
        let regs = self.call(smm::GET_FAN, side.as_raw() as u32)?;
        checked_fan_level(regs.result() as i64)
    }

    fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()> {
        let ebx = side.as_raw() as u32 | (level.as_raw() as u32) << 8;
        self.call(smm::SET_FAN, ebx)?;
        Ok(())
    }

    fn set_firmware_auto_control(&mut self, enabled: bool) -> Result<()> {
        let (disable, enable) = self.method.command_pair();
        let command = if enabled { enable } else { disable };
        debug!(enabled, method = self.method.index(), "Switching BIOS fan control");
        self.call(command, 0)?;
        Ok(())
    }
}
