//! System-wide constants.
//!
//! This module collects the fixed values shared across the simulator:
//! 1. **Protocol:** Byte-enable sentinels and the finish/print magic values.
//! 2. **Register block:** Offsets inside the control/status register block.
//! 3. **Reset vector:** The RISC-V trampoline placed in boot ROM.

/// Byte-enable value marking a lane as written.
pub const BYTE_ENABLED: u8 = 0xFF;

/// Byte-enable value marking a lane as masked off.
pub const BYTE_DISABLED: u8 = 0x00;

/// Value written to the finish register by a passing test program.
pub const FINISH_PASS: u32 = 0x5555;

/// Offset of the read-only version id word in the control/status block.
pub const SCR_VERSION_OFFSET: u64 = 0x0;

/// Offset of the finish (test status) word in the control/status block.
pub const SCR_FINISH_OFFSET: u64 = 0x8;

/// Offset of the character output word in the control/status block.
pub const SCR_PRINT_OFFSET: u64 = 0x40;

/// Value returned by reads of the version id word.
pub const SCR_VERSION_ID: u32 = 0x0001_0000;

/// Number of 32-bit words in the reset vector, including the 64-bit entry address.
pub const RESET_VECTOR_WORDS: usize = 8;

/// `auipc t0, 0x0`
pub const RV_AUIPC_T0: u32 = 0x0000_0297;

/// `addi a1, t0, 0` before the DTB offset is folded into the immediate.
pub const RV_ADDI_A1_T0: u32 = 0x0002_8593;

/// `csrr a0, mhartid`
pub const RV_CSRR_A0_MHARTID: u32 = 0xf140_2573;

/// `ld t0, 24(t0)`
pub const RV_LD_T0_24: u32 = 0x0182_b283;

/// `lw t0, 24(t0)`, used instead of `ld` on 32-bit harts.
pub const RV_LW_T0_24: u32 = 0x0182_a283;

/// `jr t0`
pub const RV_JR_T0: u32 = 0x0002_8067;
