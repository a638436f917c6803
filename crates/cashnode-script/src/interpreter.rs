//! Script verification capability.
//!
//! [`ScriptVerifier`] is the seam the proof protocol calls into: it evaluates an
//! unlocking script followed by a locking script, delegating every signature
//! and timelock decision to a [`SignatureChecker`]. [`Interpreter`] is the
//! stack machine shipped with the node; it covers the opcodes used by the
//! standard single-signature output types.

use cashnode_crypto::hash::{hash160, sha256, sha256d};
use tracing::trace;

use crate::opcodes::*;
use crate::script::{Instruction, Script};
use crate::{Result, ScriptError, MAX_OPS_PER_SCRIPT, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE};

/// Decides signature and timelock checks on behalf of a script evaluation.
pub trait SignatureChecker {
    /// Verify `sig` (with its trailing sighash byte) against `pubkey`.
    ///
    /// `script_code` is the locking script being executed.
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script) -> bool;

    fn check_lock_time(&self, lock_time: i64) -> bool;

    fn check_sequence(&self, sequence: i64) -> bool;
}

/// Evaluates an unlocking/locking script pair.
pub trait ScriptVerifier: Send + Sync {
    /// Returns `Ok(())` if `script_sig` satisfies `script_pubkey`, otherwise
    /// the reason it does not.
    fn verify_script(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        checker: &dyn SignatureChecker,
    ) -> Result<()>;
}

/// Stack-based script interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    fn eval(
        &self,
        script: &Script,
        stack: &mut Vec<Vec<u8>>,
        checker: &dyn SignatureChecker,
    ) -> Result<()> {
        let mut op_count = 0usize;

        for instruction in script.instructions() {
            match instruction? {
                Instruction::Push(data) => {
                    if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                        return Err(ScriptError::PushSize);
                    }
                    stack.push(data.to_vec());
                }
                Instruction::Op(op) => {
                    op_count += 1;
                    if op_count > MAX_OPS_PER_SCRIPT {
                        return Err(ScriptError::OpCount);
                    }
                    self.exec_op(op, script, stack, checker)?;
                }
            }
            if stack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }
        Ok(())
    }

    fn exec_op(
        &self,
        op: u8,
        script: &Script,
        stack: &mut Vec<Vec<u8>>,
        checker: &dyn SignatureChecker,
    ) -> Result<()> {
        match op {
            OP_1NEGATE => stack.push(encode_num(-1)),
            OP_1..=OP_16 => stack.push(encode_num(i64::from(op - OP_1 + 1))),
            OP_NOP => {}
            OP_VERIFY => {
                if !cast_to_bool(&pop(stack)?) {
                    return Err(ScriptError::Verify);
                }
            }
            OP_RETURN => return Err(ScriptError::OpReturn),
            OP_DROP => {
                pop(stack)?;
            }
            OP_DUP => {
                let top = top(stack)?.clone();
                stack.push(top);
            }
            OP_SWAP => {
                let len = stack.len();
                if len < 2 {
                    return Err(ScriptError::InvalidStackOperation);
                }
                stack.swap(len - 1, len - 2);
            }
            OP_EQUAL | OP_EQUALVERIFY => {
                let a = pop(stack)?;
                let b = pop(stack)?;
                let equal = a == b;
                if op == OP_EQUALVERIFY {
                    if !equal {
                        return Err(ScriptError::EqualVerify);
                    }
                } else {
                    stack.push(bool_elem(equal));
                }
            }
            OP_SHA256 => {
                let data = pop(stack)?;
                stack.push(sha256(&data).to_vec());
            }
            OP_HASH160 => {
                let data = pop(stack)?;
                stack.push(hash160(&data).to_vec());
            }
            OP_HASH256 => {
                let data = pop(stack)?;
                stack.push(sha256d(&data).to_vec());
            }
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                let pubkey = pop(stack)?;
                let sig = pop(stack)?;
                let ok = !sig.is_empty() && checker.check_sig(&sig, &pubkey, script);
                trace!(ok, "checksig");
                if op == OP_CHECKSIGVERIFY {
                    if !ok {
                        return Err(ScriptError::CheckSigVerify);
                    }
                } else {
                    stack.push(bool_elem(ok));
                }
            }
            OP_CHECKLOCKTIMEVERIFY => {
                let lock_time = decode_num(top(stack)?, 5)?;
                if lock_time < 0 || !checker.check_lock_time(lock_time) {
                    return Err(ScriptError::UnsatisfiedLocktime);
                }
            }
            OP_CHECKSEQUENCEVERIFY => {
                let sequence = decode_num(top(stack)?, 5)?;
                if sequence < 0 || !checker.check_sequence(sequence) {
                    return Err(ScriptError::UnsatisfiedLocktime);
                }
            }
            _ => return Err(ScriptError::BadOpcode),
        }
        Ok(())
    }
}

impl ScriptVerifier for Interpreter {
    fn verify_script(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        checker: &dyn SignatureChecker,
    ) -> Result<()> {
        if !script_sig.is_push_only() {
            return Err(ScriptError::SigPushOnly);
        }

        let mut stack = Vec::new();
        self.eval(script_sig, &mut stack, checker)?;
        self.eval(script_pubkey, &mut stack, checker)?;

        match stack.last() {
            Some(top) if cast_to_bool(top) => Ok(()),
            _ => Err(ScriptError::EvalFalse),
        }
    }
}

fn pop(stack: &mut Vec<Vec<u8>>) -> Result<Vec<u8>> {
    stack.pop().ok_or(ScriptError::InvalidStackOperation)
}

fn top(stack: &[Vec<u8>]) -> Result<&Vec<u8>> {
    stack.last().ok_or(ScriptError::InvalidStackOperation)
}

fn bool_elem(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Any non-zero byte is true, except a lone sign bit in the last byte
/// (negative zero).
fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            return !(i == data.len() - 1 && byte == 0x80);
        }
    }
    false
}

/// Little-endian sign-magnitude script number.
fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

fn decode_num(data: &[u8], max_len: usize) -> Result<i64> {
    if data.len() > max_len {
        return Err(ScriptError::NumOverflow);
    }
    let Some((&last, _)) = data.split_last() else {
        return Ok(0);
    };
    let mut value: i64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= i64::from(byte) << (8 * i);
    }
    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (data.len() - 1)));
        Ok(-(value & mask))
    } else {
        Ok(value)
    }
}
