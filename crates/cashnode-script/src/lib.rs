//! # cashnode-script
//!
//! Locking/unlocking scripts and the script-verification capability.
//!
//! ## Modules
//!
//! - [`opcodes`] — opcode constants
//! - [`script`] — the [`Script`] byte container, builder and instruction parser
//! - [`sighash`] — signature-hash-type flags
//! - [`interpreter`] — [`SignatureChecker`], [`ScriptVerifier`] and the
//!   stack machine that evaluates standard single-signature scripts

pub mod interpreter;
pub mod opcodes;
pub mod script;
pub mod sighash;

pub use interpreter::{Interpreter, ScriptVerifier, SignatureChecker};
pub use script::{Instruction, Script};

/// Maximum size of a single pushed stack element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of non-push opcodes executed per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Maximum combined stack depth.
pub const MAX_STACK_SIZE: usize = 1000;

/// Script evaluation failures.
///
/// The `Display` text is the human-readable failure reason reported when a
/// script does not verify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Script evaluated without error but finished with a false/empty top stack element")]
    EvalFalse,

    #[error("OP_RETURN was encountered")]
    OpReturn,

    #[error("Push value size limit exceeded")]
    PushSize,

    #[error("Operation limit exceeded")]
    OpCount,

    #[error("Stack size limit exceeded")]
    StackSize,

    #[error("Script failed an OP_VERIFY operation")]
    Verify,

    #[error("Script failed an OP_EQUALVERIFY operation")]
    EqualVerify,

    #[error("Script failed an OP_CHECKSIGVERIFY operation")]
    CheckSigVerify,

    #[error("Opcode missing or not understood")]
    BadOpcode,

    #[error("Operation not valid with the current stack size")]
    InvalidStackOperation,

    #[error("Only push operators allowed in signatures")]
    SigPushOnly,

    #[error("Locktime requirement not satisfied")]
    UnsatisfiedLocktime,

    #[error("Script number overflow")]
    NumOverflow,

    #[error("Malformed push operation")]
    MalformedPush,
}

pub type Result<T> = std::result::Result<T, ScriptError>;
