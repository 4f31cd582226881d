use thiserror::Error;

/// Fault classes used to group execution faults for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder rejected an instruction encoding.
    Decode,
    /// Fetch or data access outside mapped memory.
    Memory,
    /// Instruction asked for an exception the machine has no handler for.
    Exception,
}

/// Stable fault taxonomy raised while stepping one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCode {
    /// Encoding is unallocated in the A64 instruction set.
    #[error("unallocated instruction encoding")]
    UnallocatedEncoding,
    /// Encoding is valid A64 but outside the emulated subset.
    #[error("instruction not supported by the emulator")]
    UnsupportedEncoding,
    /// Instruction fetch from an address with no mapped memory.
    #[error("instruction fetch from unmapped memory")]
    UnmappedFetch,
    /// Load or store touched an address with no mapped memory.
    #[error("data access to unmapped memory")]
    UnmappedDataAccess,
    /// `SVC`, `HVC`, `SMC`, `BRK` or `HLT` executed without a handler.
    #[error("unhandled exception-generating instruction")]
    ExceptionGenerated,
}

impl FaultCode {
    /// Returns the reporting class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnallocatedEncoding | Self::UnsupportedEncoding => FaultClass::Decode,
            Self::UnmappedFetch | Self::UnmappedDataAccess => FaultClass::Memory,
            Self::ExceptionGenerated => FaultClass::Exception,
        }
    }
}

/// Errors surfaced by the host-facing [`crate::Machine`] API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// Register name did not resolve to an architectural register.
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    /// Host read or write touched memory that is not mapped.
    #[error("invalid memory access of {len} byte(s) at {address:#x} (unmapped)")]
    Unmapped {
        /// First byte address of the access.
        address: u64,
        /// Access length in bytes.
        len: usize,
    },
    /// A new mapping collides with an existing one.
    #[error("memory region of {size:#x} byte(s) at {base:#x} overlaps an existing mapping")]
    MapOverlap {
        /// Requested base address.
        base: u64,
        /// Requested size in bytes.
        size: u64,
    },
    /// A mapping is empty or runs past the end of the address space.
    #[error("invalid memory region of {size} byte(s) at {base:#x}")]
    InvalidRegion {
        /// Requested base address.
        base: u64,
        /// Requested size in bytes.
        size: u64,
    },
    /// Stepping raised a fault at `pc`.
    #[error("{code} at pc {pc:#x}")]
    Fault {
        /// Address of the faulting instruction.
        pc: u64,
        /// Fault raised by fetch, decode or execute.
        code: FaultCode,
    },
}

#[cfg(test)]
mod tests {
    use super::{FaultClass, FaultCode, MachineError};

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(FaultCode::UnallocatedEncoding.class(), FaultClass::Decode);
        assert_eq!(FaultCode::UnsupportedEncoding.class(), FaultClass::Decode);
        assert_eq!(FaultCode::UnmappedFetch.class(), FaultClass::Memory);
        assert_eq!(FaultCode::UnmappedDataAccess.class(), FaultClass::Memory);
        assert_eq!(FaultCode::ExceptionGenerated.class(), FaultClass::Exception);
    }

    #[test]
    fn machine_errors_render_addresses_in_hex() {
        let err = MachineError::Unmapped {
            address: 0x5000,
            len: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid memory access of 4 byte(s) at 0x5000 (unmapped)"
        );

        let err = MachineError::Fault {
            pc: 0x1000,
            code: FaultCode::UnallocatedEncoding,
        };
        assert_eq!(err.to_string(), "unallocated instruction encoding at pc 0x1000");
    }

    #[test]
    fn overlap_error_reports_requested_range() {
        let err = MachineError::MapOverlap {
            base: 0x1000,
            size: 0x80,
        };
        assert_eq!(
            err.to_string(),
            "memory region of 0x80 byte(s) at 0x1000 overlaps an existing mapping"
        );
    }
}
