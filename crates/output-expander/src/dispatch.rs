//! Stream operators that route messages to and from registers.
//!
//! All operators are plain iterator adaptors: they keep upstream order, hold
//! no state beyond the selected register, and never buffer except where
//! grouping collects a finite input.

use crate::codec::{Register, RegisterCodec};
use crate::error::{RegisterError, Result};
use crate::payload::Timestamped;
use crate::registers::{RegisterId, RegisterValue};
use harp_message::{HarpMessage, MessageType, DEFAULT_PORT};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::warn;

/// Whether a filter keeps or drops the selected register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterGroup {
    pub register: RegisterId,
    pub messages: Vec<HarpMessage>,
}

/// Messages partitioned by register, in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct RegisterGroups {
    groups: Vec<RegisterGroup>,
    index: HashMap<RegisterId, usize>,
    unknown: Vec<HarpMessage>,
}

impl RegisterGroups {
    pub fn push(&mut self, message: HarpMessage) {
        let Some(id) = RegisterId::from_address(message.address) else {
            warn!(address = message.address, "message for unknown register");
            self.unknown.push(message);
            return;
        };
        match self.index.get(&id) {
            Some(&i) => self.groups[i].messages.push(message),
            None => {
                self.index.insert(id, self.groups.len());
                self.groups.push(RegisterGroup {
                    register: id,
                    messages: vec![message],
                });
            }
        }
    }

    pub fn get(&self, register: RegisterId) -> Option<&[HarpMessage]> {
        self.index
            .get(&register)
            .map(|&i| self.groups[i].messages.as_slice())
    }

    pub fn registers(&self) -> impl Iterator<Item = RegisterId> + '_ {
        self.groups.iter().map(|g| g.register)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterGroup> {
        self.groups.iter()
    }

    /// Number of registers seen
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Messages whose address matched no register
    pub fn unknown(&self) -> &[HarpMessage] {
        &self.unknown
    }

    pub fn into_groups(self) -> Vec<RegisterGroup> {
        self.groups
    }
}

impl Extend<HarpMessage> for RegisterGroups {
    fn extend<T: IntoIterator<Item = HarpMessage>>(&mut self, iter: T) {
        for message in iter {
            self.push(message);
        }
    }
}

impl FromIterator<HarpMessage> for RegisterGroups {
    fn from_iter<T: IntoIterator<Item = HarpMessage>>(iter: T) -> Self {
        let mut groups = Self::default();
        groups.extend(iter);
        groups
    }
}

/// Partition messages per register. Relative order inside each group is the
/// input order; unknown addresses are collected apart.
pub fn group_by_register<I>(messages: I) -> RegisterGroups
where
    I: IntoIterator<Item = HarpMessage>,
{
    messages.into_iter().collect()
}

pub struct FilterRegister<I> {
    inner: I,
    address: u16,
    mode: FilterMode,
}

impl<I: Iterator<Item = HarpMessage>> Iterator for FilterRegister<I> {
    type Item = HarpMessage;

    fn next(&mut self) -> Option<HarpMessage> {
        let address = self.address;
        let keep = self.mode == FilterMode::Include;
        self.inner.find(|m| (m.address == address) == keep)
    }
}

pub struct KeyedByRegister<I> {
    inner: I,
}

impl<I: Iterator<Item = HarpMessage>> Iterator for KeyedByRegister<I> {
    type Item = Result<(RegisterId, HarpMessage)>;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.inner.next()?;
        Some(match RegisterId::from_address(message.address) {
            Some(id) => Ok((id, message)),
            None => Err(RegisterError::UnknownRegister(message.address)),
        })
    }
}

pub struct ParseRegister<I, R> {
    inner: I,
    _register: PhantomData<fn() -> R>,
}

impl<I: Iterator<Item = HarpMessage>, R: Register> Iterator for ParseRegister<I, R> {
    type Item = Result<R::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.inner.find(|m| m.address == R::ADDRESS)?;
        Some(R::decode(&message))
    }
}

pub struct ParseRegisterTimestamped<I, R> {
    inner: I,
    _register: PhantomData<fn() -> R>,
}

impl<I: Iterator<Item = HarpMessage>, R: Register> Iterator for ParseRegisterTimestamped<I, R> {
    type Item = Result<Timestamped<R::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.inner.find(|m| m.address == R::ADDRESS)?;
        Some(R::decode_timestamped(&message))
    }
}

pub struct ParseAll<'a, I> {
    inner: I,
    codec: &'a RegisterCodec,
}

impl<I: Iterator<Item = HarpMessage>> Iterator for ParseAll<'_, I> {
    type Item = Result<RegisterValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.inner.next()?;
        Some(self.codec.parse(&message))
    }
}

/// Register-aware adaptors for any iterator of messages
pub trait MessageStreamExt: Iterator<Item = HarpMessage> + Sized {
    /// Keep (or drop) the messages addressed to `register`
    fn filter_register(self, register: RegisterId, mode: FilterMode) -> FilterRegister<Self> {
        FilterRegister {
            inner: self,
            address: register.address(),
            mode,
        }
    }

    /// Tag each message with its register; unknown addresses become errors
    fn keyed_by_register(self) -> KeyedByRegister<Self> {
        KeyedByRegister { inner: self }
    }

    /// Keep the messages addressed to `R` and decode their payloads
    fn parse_register<R: Register>(self) -> ParseRegister<Self, R> {
        ParseRegister {
            inner: self,
            _register: PhantomData,
        }
    }

    fn parse_register_timestamped<R: Register>(self) -> ParseRegisterTimestamped<Self, R> {
        ParseRegisterTimestamped {
            inner: self,
            _register: PhantomData,
        }
    }

    /// Decode every message by its address
    fn parse_all(self, codec: &RegisterCodec) -> ParseAll<'_, Self> {
        ParseAll { inner: self, codec }
    }
}

impl<I: Iterator<Item = HarpMessage>> MessageStreamExt for I {}

/// Builds messages for one register from a stream of values
pub struct CreateMessage<R> {
    message_type: MessageType,
    timestamp: Option<f64>,
    port: u8,
    _register: PhantomData<fn() -> R>,
}

impl<R: Register> CreateMessage<R> {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            timestamp: None,
            port: DEFAULT_PORT,
            _register: PhantomData,
        }
    }

    pub fn with_timestamp(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    pub fn with_port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    pub fn create(&self, value: R::Value) -> HarpMessage {
        let message = match self.timestamp {
            Some(ts) => R::encode_timestamped(ts, self.message_type, value),
            None => R::encode(self.message_type, value),
        };
        message.with_port(self.port)
    }

    pub fn apply<V>(self, values: V) -> impl Iterator<Item = HarpMessage>
    where
        V: IntoIterator<Item = R::Value>,
    {
        values.into_iter().map(move |v| self.create(v))
    }
}
