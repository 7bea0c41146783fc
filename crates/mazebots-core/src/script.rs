//! Instruction set and script encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Integer code for [`Instruction::Forward`].
pub const FORWARD_CODE: i64 = -1;
/// Integer code for [`Instruction::TurnLeft`].
pub const TURN_LEFT_CODE: i64 = -2;
/// Integer code for [`Instruction::TurnRight`].
pub const TURN_RIGHT_CODE: i64 = -3;

/// Errors raised when decoding or parsing scripts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script must contain at least one instruction")]
    Empty,
    #[error("instruction {index} has unknown code {code}")]
    UnknownCode { index: usize, code: i64 },
    #[error("unexpected token {token:?} at byte {offset}")]
    InvalidToken { offset: usize, token: String },
}

/// One step of an agent program.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Instruction {
    Forward,
    TurnLeft,
    TurnRight,
    /// Unconditional jump. The target is reduced modulo the script length when executed.
    Jump(usize),
}

impl Instruction {
    /// Integer code used on the wire.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Forward => FORWARD_CODE,
            Self::TurnLeft => TURN_LEFT_CODE,
            Self::TurnRight => TURN_RIGHT_CODE,
            Self::Jump(target) => i64::try_from(target).unwrap_or(i64::MAX),
        }
    }

    /// Decode an integer code; `None` for negative codes outside the instruction set.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            FORWARD_CODE => Some(Self::Forward),
            TURN_LEFT_CODE => Some(Self::TurnLeft),
            TURN_RIGHT_CODE => Some(Self::TurnRight),
            target if target >= 0 => usize::try_from(target).ok().map(Self::Jump),
            _ => None,
        }
    }

    #[must_use]
    pub const fn jump_target(self) -> Option<usize> {
        match self {
            Self::Jump(target) => Some(target),
            _ => None,
        }
    }

    /// Uppercase mnemonic shown in listings.
    #[must_use]
    pub fn mnemonic(self) -> String {
        match self {
            Self::Forward => "FORWARD".to_string(),
            Self::TurnLeft => "LEFT".to_string(),
            Self::TurnRight => "RIGHT".to_string(),
            Self::Jump(target) => format!("GOTO({target})"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("F"),
            Self::TurnLeft => f.write_str("L"),
            Self::TurnRight => f.write_str("R"),
            Self::Jump(target) => write!(f, "G{target}"),
        }
    }
}

/// Ordered agent program.
///
/// Serialises as the list of integer codes (`-1` forward, `-2` left,
/// `-3` right, `n >= 0` jump). The [`Display`](fmt::Display) form is the
/// identity string used for genotype deduplication, e.g. `"FLRG2"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct Script {
    instructions: Vec<Instruction>,
}

impl Script {
    /// Wrap an instruction list. Empty scripts are allowed here so mutation
    /// can produce them; callers reject them before evaluation.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Decode a non-empty list of integer codes.
    pub fn from_codes(codes: &[i64]) -> Result<Self, ScriptError> {
        if codes.is_empty() {
            return Err(ScriptError::Empty);
        }
        let instructions = codes
            .iter()
            .enumerate()
            .map(|(index, &code)| {
                Instruction::from_code(code).ok_or(ScriptError::UnknownCode { index, code })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { instructions })
    }

    #[must_use]
    pub fn codes(&self) -> Vec<i64> {
        self.instructions.iter().map(|inst| inst.code()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Instruction> {
        self.instructions.get(index).copied()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().copied()
    }

    #[must_use]
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Canonical genotype key.
    #[must_use]
    pub fn identity(&self) -> String {
        self.to_string()
    }

    /// Numbered, human-readable listing (`0:FORWARD`, `1:GOTO(0)`, ...).
    #[must_use]
    pub fn listing(&self) -> Vec<String> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(index, inst)| format!("{index}:{}", inst.mnemonic()))
            .collect()
    }
}

impl From<Vec<Instruction>> for Script {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl TryFrom<Vec<i64>> for Script {
    type Error = ScriptError;

    fn try_from(codes: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_codes(&codes)
    }
}

impl From<Script> for Vec<i64> {
    fn from(script: Script) -> Self {
        script.codes()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            write!(f, "{inst}")?;
        }
        Ok(())
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    /// Parse an identity string back into a script.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = text.as_bytes();
        let mut instructions = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let inst = match bytes[offset] {
                b'F' => Instruction::Forward,
                b'L' => Instruction::TurnLeft,
                b'R' => Instruction::TurnRight,
                b'G' => {
                    let digits = bytes[offset + 1..]
                        .iter()
                        .take_while(|byte| byte.is_ascii_digit())
                        .count();
                    let end = offset + 1 + digits;
                    let target = text[offset + 1..end].parse::<usize>().map_err(|_| {
                        ScriptError::InvalidToken {
                            offset,
                            token: text[offset..end].to_string(),
                        }
                    })?;
                    instructions.push(Instruction::Jump(target));
                    offset = end;
                    continue;
                }
                _ => {
                    let token = text[offset..].chars().next().map(String::from).unwrap_or_default();
                    return Err(ScriptError::InvalidToken { offset, token });
                }
            };
            instructions.push(inst);
            offset += 1;
        }
        if instructions.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self { instructions })
    }
}
