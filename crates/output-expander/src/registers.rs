//! The Output Expander register map.
//!
//! Every register is declared once in `register_table!`, which expands into a
//! unit type implementing [`Register`], a [`RegisterId`] variant, a
//! [`RegisterValue`] variant and a row of [`REGISTERS`]. Addresses, payload
//! kinds and lengths are the device's wire contract.

use crate::codec::Register;
use crate::composite::{MagneticEncoderPayload, OpticalFlowPayload};
use crate::error::{RegisterError, Result};
use crate::flags::*;
use crate::payload::{PayloadKind, PayloadValue, ValueShape};
use core::fmt;
use harp_message::PayloadType;

/// Harp `WhoAmI` of the Output Expander
pub const WHO_AM_I: u16 = 1108;
pub const DEVICE_NAME: &str = "OutputExpander";

bitflags::bitflags! {
    /// Message types a register answers to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const READ = 0x1;
        const WRITE = 0x2;
        const EVENT = 0x4;
    }
}

impl Access {
    pub const R: Self = Self::READ;
    pub const W: Self = Self::WRITE;
    pub const RW: Self = Self::READ.union(Self::WRITE);
    pub const RE: Self = Self::READ.union(Self::EVENT);
    pub const RWE: Self = Self::RW.union(Self::EVENT);

    pub fn as_str(self) -> &'static str {
        match (
            self.contains(Self::READ),
            self.contains(Self::WRITE),
            self.contains(Self::EVENT),
        ) {
            (true, true, true) => "RWE",
            (true, true, false) => "RW",
            (true, false, true) => "RE",
            (true, false, false) => "R",
            (false, true, true) => "WE",
            (false, true, false) => "W",
            (false, false, true) => "E",
            (false, false, false) => "-",
        }
    }
}

/// Static description of one register
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterDescriptor {
    pub id: RegisterId,
    pub address: u16,
    pub name: &'static str,
    pub kind: PayloadKind,
    /// Element count
    pub length: u8,
    pub shape: ValueShape,
    pub access: Access,
    doc: &'static str,
}

impl RegisterDescriptor {
    pub fn payload_type(&self) -> PayloadType {
        self.kind.payload_type()
    }

    /// Payload size in bytes
    pub fn byte_len(&self) -> usize {
        self.kind.width() * usize::from(self.length)
    }

    pub fn description(&self) -> &'static str {
        self.doc.trim()
    }
}

macro_rules! register_table {
    ($(
        $(#[doc = $doc:literal])*
        $name:ident = $addr:literal : $value:ty, $access:ident;
    )+) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            pub struct $name;

            impl Register for $name {
                const ADDRESS: u16 = $addr;
                const NAME: &'static str = stringify!($name);
                const ID: RegisterId = RegisterId::$name;
                type Value = $value;
            }
        )+

        /// Closed identity of every register on the device
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RegisterId {
            $($name,)+
        }

        impl RegisterId {
            /// All registers, ordered by address
            pub const ALL: &'static [RegisterId] = &[$(RegisterId::$name,)+];

            pub const fn address(self) -> u16 {
                match self {
                    $(RegisterId::$name => $addr,)+
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(RegisterId::$name => stringify!($name),)+
                }
            }

            pub fn from_address(address: u16) -> Option<Self> {
                match address {
                    $($addr => Some(RegisterId::$name),)+
                    _ => None,
                }
            }

            /// Look a register up by name, ignoring case
            pub fn from_name(name: &str) -> Option<Self> {
                let name = name.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|id| id.name().eq_ignore_ascii_case(name))
            }

            pub fn descriptor(self) -> &'static RegisterDescriptor {
                &REGISTERS[self as usize]
            }
        }

        /// The register table, ordered by address
        pub static REGISTERS: &[RegisterDescriptor] = &[$(
            RegisterDescriptor {
                id: RegisterId::$name,
                address: $addr,
                name: stringify!($name),
                kind: <$value as PayloadValue>::KIND,
                length: <$value as PayloadValue>::LENGTH,
                shape: <$value as PayloadValue>::SHAPE,
                access: Access::$access,
                doc: concat!($($doc),*),
            },
        )+];

        /// A decoded payload tagged with the register it belongs to
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum RegisterValue {
            $($name($value),)+
        }

        impl RegisterValue {
            pub fn id(&self) -> RegisterId {
                match self {
                    $(RegisterValue::$name(_) => RegisterId::$name,)+
                }
            }

            pub fn to_text(&self) -> String {
                match self {
                    $(RegisterValue::$name(v) => v.to_text(),)+
                }
            }

            /// Parse the text form of a value for `register`
            pub fn parse_text(register: RegisterId, text: &str) -> Result<Self> {
                let parsed = match register {
                    $(RegisterId::$name => {
                        <$value as PayloadValue>::parse_text(text).map(RegisterValue::$name)
                    })+
                };
                parsed.ok_or_else(|| RegisterError::InvalidValue {
                    register: register.name(),
                    text: text.to_string(),
                })
            }

            pub(crate) fn read(register: RegisterId, bytes: &[u8]) -> Option<Self> {
                match register {
                    $(RegisterId::$name => {
                        <$value as PayloadValue>::read(bytes).map(RegisterValue::$name)
                    })+
                }
            }

            pub fn to_bytes(&self) -> Vec<u8> {
                match self {
                    $(RegisterValue::$name(v) => v.to_bytes(),)+
                }
            }
        }
    };
}

register_table! {
    /// State of the auxiliary inputs
    AuxInState = 32: AuxiliaryInputs, RE;
    /// Auxiliary inputs that raise an event on a rising edge
    AuxInRisingEdge = 33: AuxiliaryInputs, RW;
    /// Auxiliary inputs that raise an event on a falling edge
    AuxInFallingEdge = 34: AuxiliaryInputs, RW;
    /// Set the selected digital outputs
    OutputSet = 35: DigitalOutputs, W;
    /// Clear the selected digital outputs
    OutputClear = 36: DigitalOutputs, W;
    /// Toggle the selected digital outputs
    OutputToggle = 37: DigitalOutputs, W;
    /// State of all digital outputs
    OutputState = 38: DigitalOutputs, RW;
    /// Outputs driven by the PWM generators and the stimulation channel
    PwmAndStimEnable = 39: PwmAndStimMappings, RW;
    /// Start the selected PWM generators
    PwmStart = 40: PwmChannels, W;
    /// Stop the selected PWM generators
    PwmStop = 41: PwmChannels, W;
    /// PWM0 frequency in Hz (0.5 to 1000)
    Pwm0Frequency = 42: f32, RW;
    /// PWM0 duty cycle in percent (1 to 99)
    Pwm0DutyCycle = 43: f32, RW;
    /// PWM0 pulses per train in finite mode
    Pwm0PulseCount = 44: u16, RW;
    /// PWM0 frequency achieved by the hardware, in Hz
    Pwm0ActualFrequency = 45: f32, R;
    /// PWM0 duty cycle achieved by the hardware, in percent
    Pwm0ActualDutyCycle = 46: f32, R;
    /// PWM0 acquisition mode
    Pwm0AcquisitionMode = 47: AcquisitionMode, RW;
    /// PWM0 trigger source
    Pwm0TriggerSource = 48: TriggerSource, RW;
    /// PWM1 frequency in Hz (0.5 to 1000)
    Pwm1Frequency = 49: f32, RW;
    /// PWM1 duty cycle in percent (1 to 99)
    Pwm1DutyCycle = 50: f32, RW;
    /// PWM1 pulses per train in finite mode
    Pwm1PulseCount = 51: u16, RW;
    /// PWM1 frequency achieved by the hardware, in Hz
    Pwm1ActualFrequency = 52: f32, R;
    /// PWM1 duty cycle achieved by the hardware, in percent
    Pwm1ActualDutyCycle = 53: f32, R;
    /// PWM1 acquisition mode
    Pwm1AcquisitionMode = 54: AcquisitionMode, RW;
    /// PWM1 trigger source
    Pwm1TriggerSource = 55: TriggerSource, RW;
    /// PWM2 frequency in Hz (0.5 to 1000)
    Pwm2Frequency = 56: f32, RW;
    /// PWM2 duty cycle in percent (1 to 99)
    Pwm2DutyCycle = 57: f32, RW;
    /// PWM2 pulses per train in finite mode
    Pwm2PulseCount = 58: u16, RW;
    /// PWM2 frequency achieved by the hardware, in Hz
    Pwm2ActualFrequency = 59: f32, R;
    /// PWM2 duty cycle achieved by the hardware, in percent
    Pwm2ActualDutyCycle = 60: f32, R;
    /// PWM2 acquisition mode
    Pwm2AcquisitionMode = 61: AcquisitionMode, RW;
    /// PWM2 trigger source
    Pwm2TriggerSource = 62: TriggerSource, RW;
    /// PWM generators that raise an event on each rising edge
    PwmRiseEvent = 63: PwmChannels, RWE;
    /// Stimulation on time in milliseconds
    Stim0OnTime = 64: u16, RW;
    /// Stimulation off time in milliseconds
    Stim0OffTime = 65: u16, RW;
    /// Stimulation pulses per train in finite mode
    Stim0Repetitions = 66: u32, RW;
    /// Stimulation current in milliamperes
    Stim0Current = 67: u16, RW;
    /// Stimulation acquisition mode
    Stim0AcquisitionMode = 68: AcquisitionMode, RW;
    /// Stimulation trigger source
    Stim0TriggerSource = 69: TriggerSource, RW;
    /// Start the stimulation train
    StimStart = 70: EnableFlag, W;
    /// Stop the stimulation train
    StimStop = 71: EnableFlag, W;
    /// Board fitted to the expansion connector
    ExpansionBoard = 72: ExpansionBoardType, RW;
    /// Servo 0 period in microseconds
    Servo0Period = 73: u16, RW;
    /// Servo 0 pulse width in microseconds
    Servo0PulseWidth = 74: u16, RW;
    /// Servo 1 period in microseconds
    Servo1Period = 75: u16, RW;
    /// Servo 1 pulse width in microseconds
    Servo1PulseWidth = 76: u16, RW;
    /// Servo 2 period in microseconds
    Servo2Period = 77: u16, RW;
    /// Servo 2 pulse width in microseconds
    Servo2PulseWidth = 78: u16, RW;
    /// Enable the selected servo outputs
    ServoEnable = 79: ServoChannels, W;
    /// Disable the selected servo outputs
    ServoDisable = 80: ServoChannels, W;
    /// Servo outputs currently enabled
    ServoState = 81: ServoChannels, R;
    /// Magnetic encoder sampling rate
    MagneticEncoderSampleRate = 82: SampleRate, RW;
    /// Magnetic encoder counting direction
    MagneticEncoderDirection = 83: EncoderDirection, RW;
    /// Reset the magnetic encoder zero position
    MagneticEncoderReset = 84: EnableFlag, W;
    /// Magnetic encoder zero offset
    MagneticEncoderOffset = 85: i16, RW;
    /// Optical flow sampling rate
    OpticalFlowSampleRate = 86: SampleRate, RW;
    /// Optical flow sensor resolution in counts per inch
    OpticalFlowResolution = 87: u16, RW;
    /// Optical flow lift-off detection threshold
    OpticalFlowLiftOffThreshold = 88: u8, RW;
    /// Events the device is allowed to emit
    EventEnable = 89: EventFlags, RW;
    /// Magnetic encoder angle and magnitude
    MagneticEncoder = 90: MagneticEncoderPayload, RE;
    /// Optical flow motion delta and surface quality
    OpticalFlow = 91: OpticalFlowPayload, RE;
    /// Outputs that return low after their configured pulse width
    OutputPulseEnable = 92: DigitalOutputs, RW;
    /// Output 0 pulse width in milliseconds
    Out0PulseWidth = 93: u16, RW;
    /// Output 1 pulse width in milliseconds
    Out1PulseWidth = 94: u16, RW;
    /// Output 2 pulse width in milliseconds
    Out2PulseWidth = 95: u16, RW;
    /// Output 3 pulse width in milliseconds
    Out3PulseWidth = 96: u16, RW;
    /// Output 4 pulse width in milliseconds
    Out4PulseWidth = 97: u16, RW;
    /// Output 5 pulse width in milliseconds
    Out5PulseWidth = 98: u16, RW;
    /// Output 6 pulse width in milliseconds
    Out6PulseWidth = 99: u16, RW;
    /// Output 7 pulse width in milliseconds
    Out7PulseWidth = 100: u16, RW;
    /// Output 8 pulse width in milliseconds
    Out8PulseWidth = 101: u16, RW;
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.id(), self.to_text())
    }
}

/// Find a register by address
pub fn descriptor(address: u16) -> Option<&'static RegisterDescriptor> {
    RegisterId::from_address(address).map(RegisterId::descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_seventy_unique_addresses() {
        assert_eq!(REGISTERS.len(), 70);
        let addresses: HashSet<u16> = REGISTERS.iter().map(|d| d.address).collect();
        assert_eq!(addresses.len(), REGISTERS.len());
    }

    #[test]
    fn table_is_ordered_and_indexed_by_id() {
        for (i, d) in REGISTERS.iter().enumerate() {
            assert_eq!(d.id as usize, i);
            assert_eq!(d.id.descriptor().address, d.address);
            assert_eq!(RegisterId::from_address(d.address), Some(d.id));
            assert_eq!(d.id.name(), d.name);
        }
        assert!(REGISTERS.windows(2).all(|w| w[0].address < w[1].address));
        assert_eq!(RegisterId::ALL.len(), REGISTERS.len());
    }

    #[test]
    fn wire_shapes_of_anchor_registers() {
        let d = RegisterId::OutputSet.descriptor();
        assert_eq!((d.address, d.kind, d.length), (35, PayloadKind::U16, 1));
        assert_eq!(d.shape, ValueShape::Flags("DigitalOutputs"));

        let d = RegisterId::Pwm0Frequency.descriptor();
        assert_eq!((d.address, d.kind, d.length), (42, PayloadKind::Float, 1));

        let d = RegisterId::MagneticEncoder.descriptor();
        assert_eq!((d.address, d.kind, d.length), (90, PayloadKind::U16, 2));
        assert_eq!(d.byte_len(), 4);
        assert_eq!(d.shape, ValueShape::Composite(&["angle", "magnitude"]));

        let d = RegisterId::OpticalFlow.descriptor();
        assert_eq!((d.address, d.kind, d.length), (91, PayloadKind::S16, 3));

        let d = RegisterId::Stim0Repetitions.descriptor();
        assert_eq!(d.payload_type(), PayloadType::U32);
    }

    #[test]
    fn lookups() {
        assert_eq!(RegisterId::from_name("outputset"), Some(RegisterId::OutputSet));
        assert_eq!(RegisterId::from_name(" AuxInState "), Some(RegisterId::AuxInState));
        assert_eq!(RegisterId::from_name("Nope"), None);
        assert_eq!(RegisterId::from_address(31), None);
        assert_eq!(RegisterId::from_address(102), None);
        assert_eq!(descriptor(93).map(|d| d.name), Some("Out0PulseWidth"));
        assert_eq!(<Pwm0Frequency as Register>::ADDRESS, 42);
        assert_eq!(RegisterId::AuxInState.descriptor().access, Access::RE);
        assert_eq!(Access::RWE.as_str(), "RWE");
    }

    #[test]
    fn descriptions_are_trimmed() {
        assert_eq!(
            RegisterId::OutputSet.descriptor().description(),
            "Set the selected digital outputs"
        );
    }

    #[test]
    fn value_text_is_register_aware() {
        let v = RegisterValue::parse_text(RegisterId::OutputSet, "OUT0 | OUT3").unwrap();
        assert_eq!(v, RegisterValue::OutputSet(DigitalOutputs::from_bits_retain(0x9)));
        assert_eq!(v.to_string(), "OutputSet=OUT0 | OUT3");
        let err = RegisterValue::parse_text(RegisterId::Pwm0Frequency, "fast").unwrap_err();
        assert!(matches!(err, RegisterError::InvalidValue { register: "Pwm0Frequency", .. }));
    }
}
