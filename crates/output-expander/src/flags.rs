//! Bitflag sets and closed enums carried by Output Expander registers.
//!
//! Both kinds keep whatever integer arrives on the wire: unknown bits and
//! unnamed enum values survive a decode/encode cycle untouched.

use crate::payload::{PayloadKind, PayloadValue, ValueShape};
use core::fmt;

bitflags::bitflags! {
    /// Auxiliary digital inputs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AuxiliaryInputs: u8 {
        const AUX0 = 0x1;
        const AUX1 = 0x2;
        const AUX2 = 0x4;
    }
}

bitflags::bitflags! {
    /// Digital output lines
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DigitalOutputs: u16 {
        const OUT0 = 1 << 0;
        const OUT1 = 1 << 1;
        const OUT2 = 1 << 2;
        const OUT3 = 1 << 3;
        const OUT4 = 1 << 4;
        const OUT5 = 1 << 5;
        const OUT6 = 1 << 6;
        const OUT7 = 1 << 7;
        const OUT8 = 1 << 8;
    }
}

bitflags::bitflags! {
    /// Routing of PWM generators and the stimulation channel to outputs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PwmAndStimMappings: u16 {
        const PWM0_TO_OUT0 = 0x001;
        const PWM1_TO_OUT1 = 0x002;
        const PWM2_TO_OUT2 = 0x004;
        const PWM0_TO_OUT3 = 0x008;
        const PWM1_TO_OUT4 = 0x010;
        const PWM2_TO_OUT5 = 0x020;
        const STIM0_TO_OUT3 = 0x040;
        const STIM0_TO_OUT4 = 0x080;
        const STIM0_TO_OUT5 = 0x100;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PwmChannels: u8 {
        const PWM0 = 0x1;
        const PWM1 = 0x2;
        const PWM2 = 0x4;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ServoChannels: u8 {
        const SERVO0 = 0x1;
        const SERVO1 = 0x2;
        const SERVO2 = 0x4;
    }
}

bitflags::bitflags! {
    /// Events the device is allowed to emit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u8 {
        const AUX_IN_STATE = 0x01;
        const PWM_RISE = 0x02;
        const STIM_STATE = 0x04;
        const MAGNETIC_ENCODER = 0x08;
        const OPTICAL_FLOW = 0x10;
    }
}

/// Flag names are matched case-insensitively; hex tokens keep their `0x` prefix.
fn normalize_flag_text(text: &str) -> String {
    text.split('|')
        .map(|token| {
            let t = token.trim();
            match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                Some(hex) => format!("0x{hex}"),
                None => t.to_ascii_uppercase(),
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

macro_rules! flags_payload {
    ($($name:ident: $bits:ty => $kind:ident),* $(,)?) => {$(
        impl PayloadValue for $name {
            const KIND: PayloadKind = PayloadKind::$kind;
            const LENGTH: u8 = 1;
            const SHAPE: ValueShape = ValueShape::Flags(stringify!($name));

            fn read(bytes: &[u8]) -> Option<Self> {
                <$bits as PayloadValue>::read(bytes).map(Self::from_bits_retain)
            }

            fn write(&self, out: &mut Vec<u8>) {
                self.bits().write(out)
            }

            fn to_text(&self) -> String {
                if self.is_empty() {
                    return "0x0".to_string();
                }
                let mut s = String::new();
                if bitflags::parser::to_writer(self, &mut s).is_err() {
                    return format!("{:#x}", self.bits());
                }
                s
            }

            fn parse_text(text: &str) -> Option<Self> {
                if let Some(bits) = <$bits as PayloadValue>::parse_text(text) {
                    return Some(Self::from_bits_retain(bits));
                }
                bitflags::parser::from_str(&normalize_flag_text(text)).ok()
            }
        }
    )*};
}

flags_payload! {
    AuxiliaryInputs: u8 => U8,
    DigitalOutputs: u16 => U16,
    PwmAndStimMappings: u16 => U16,
    PwmChannels: u8 => U8,
    ServoChannels: u8 => U8,
    EventFlags: u8 => U8,
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident: $bits:ty => $kind:ident {
            $($variant:ident = $value:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $bits);

        impl $name {
            $(pub const $variant: Self = Self($value);)+

            /// Named values, in declaration order
            pub const KNOWN: &'static [(&'static str, $name)] = &[$(($text, Self::$variant)),+];

            pub const fn bits(self) -> $bits {
                self.0
            }

            pub fn name(self) -> Option<&'static str> {
                Self::KNOWN
                    .iter()
                    .find(|(_, v)| *v == self)
                    .map(|(n, _)| *n)
            }

            pub fn is_known(self) -> bool {
                self.name().is_some()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(n) => f.write_str(n),
                    None => write!(f, "{}", self.0),
                }
            }
        }

        impl PayloadValue for $name {
            const KIND: PayloadKind = PayloadKind::$kind;
            const LENGTH: u8 = 1;
            const SHAPE: ValueShape = ValueShape::Enum(stringify!($name));

            fn read(bytes: &[u8]) -> Option<Self> {
                <$bits as PayloadValue>::read(bytes).map(Self)
            }

            fn write(&self, out: &mut Vec<u8>) {
                self.0.write(out)
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn parse_text(text: &str) -> Option<Self> {
                let t = text.trim();
                Self::KNOWN
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(t))
                    .map(|(_, v)| *v)
                    .or_else(|| <$bits as PayloadValue>::parse_text(t).map(Self))
            }
        }
    };
}

closed_enum! {
    /// What starts a PWM or stimulation train
    TriggerSource: u8 => U8 {
        SOFTWARE = 0 => "Software",
        AUX0_RISING_EDGE = 1 => "Aux0RisingEdge",
        AUX0_FALLING_EDGE = 2 => "Aux0FallingEdge",
        AUX0_WHILE_HIGH = 4 => "Aux0WhileHigh",
        AUX0_WHILE_LOW = 8 => "Aux0WhileLow",
        AUX1_RISING_EDGE = 16 => "Aux1RisingEdge",
        AUX1_FALLING_EDGE = 32 => "Aux1FallingEdge",
        AUX1_WHILE_HIGH = 64 => "Aux1WhileHigh",
        AUX1_WHILE_LOW = 128 => "Aux1WhileLow",
    }
}

closed_enum! {
    AcquisitionMode: u8 => U8 {
        CONTINUOUS = 0 => "Continuous",
        FINITE = 1 => "Finite",
    }
}

closed_enum! {
    /// Board fitted to the expansion connector
    ExpansionBoardType: u8 => U8 {
        NONE = 0 => "None",
        BREAKOUT = 1 => "Breakout",
        MAGNETIC_ENCODER = 2 => "MagneticEncoder",
        SERVO_MOTOR = 3 => "ServoMotor",
        OPTICAL_FLOW = 4 => "OpticalFlow",
    }
}

closed_enum! {
    EnableFlag: u8 => U8 {
        DISABLED = 0 => "Disabled",
        ENABLED = 1 => "Enabled",
    }
}

closed_enum! {
    /// Sampling rate of the expansion-board sensors
    SampleRate: u8 => U8 {
        RATE_50HZ = 0 => "Rate50Hz",
        RATE_100HZ = 1 => "Rate100Hz",
        RATE_200HZ = 2 => "Rate200Hz",
        RATE_500HZ = 3 => "Rate500Hz",
        RATE_1000HZ = 4 => "Rate1000Hz",
    }
}

closed_enum! {
    EncoderDirection: u8 => U8 {
        CLOCKWISE = 0 => "Clockwise",
        COUNTER_CLOCKWISE = 1 => "CounterClockwise",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TriggerSource::SOFTWARE, 0)]
    #[case(TriggerSource::AUX0_WHILE_LOW, 8)]
    #[case(TriggerSource::AUX1_RISING_EDGE, 16)]
    #[case(TriggerSource::AUX1_WHILE_LOW, 128)]
    fn trigger_source_wire_values(#[case] source: TriggerSource, #[case] raw: u8) {
        assert_eq!(source.bits(), raw);
        assert_eq!(source.to_bytes(), vec![raw]);
    }

    #[rstest]
    #[case(PwmAndStimMappings::PWM0_TO_OUT0, 0x001)]
    #[case(PwmAndStimMappings::PWM2_TO_OUT5, 0x020)]
    #[case(PwmAndStimMappings::STIM0_TO_OUT5, 0x100)]
    fn mapping_wire_values(#[case] mapping: PwmAndStimMappings, #[case] raw: u16) {
        assert_eq!(mapping.bits(), raw);
    }

    #[test]
    fn digital_outputs_cover_nine_lines() {
        assert_eq!(DigitalOutputs::all().bits(), 0x01FF);
        assert_eq!((DigitalOutputs::OUT0 | DigitalOutputs::OUT3).bits(), 0x9);
    }

    #[test]
    fn unknown_bits_pass_through() {
        let flags = DigitalOutputs::read(&[0x00, 0x80]).unwrap();
        assert_eq!(flags.bits(), 0x8000);
        assert_eq!(flags.to_bytes(), vec![0x00, 0x80]);
    }

    #[test]
    fn unknown_enum_values_pass_through() {
        let mode = AcquisitionMode::read(&[7]).unwrap();
        assert_eq!(mode.bits(), 7);
        assert!(!mode.is_known());
        assert_eq!(mode.to_text(), "7");
        assert_eq!(mode.to_bytes(), vec![7]);
    }

    #[test]
    fn flags_text_round_trip() {
        let flags = DigitalOutputs::OUT0 | DigitalOutputs::OUT3;
        let text = flags.to_text();
        assert_eq!(text, "OUT0 | OUT3");
        assert_eq!(DigitalOutputs::parse_text(&text), Some(flags));
        assert_eq!(DigitalOutputs::parse_text("out0|out3"), Some(flags));
        assert_eq!(DigitalOutputs::parse_text("9"), Some(flags));
        assert_eq!(DigitalOutputs::parse_text("0x0"), Some(DigitalOutputs::empty()));
        assert_eq!(DigitalOutputs::empty().to_text(), "0x0");
        assert_eq!(DigitalOutputs::parse_text("OUT9"), None);

        let odd = DigitalOutputs::from_bits_retain(0x8001);
        assert_eq!(odd.to_text(), "OUT0 | 0x8000");
        assert_eq!(DigitalOutputs::parse_text(&odd.to_text()), Some(odd));
    }

    #[test]
    fn enum_text_forms() {
        assert_eq!(
            TriggerSource::parse_text("aux1whilelow"),
            Some(TriggerSource::AUX1_WHILE_LOW)
        );
        assert_eq!(TriggerSource::parse_text("128"), Some(TriggerSource::AUX1_WHILE_LOW));
        assert_eq!(ExpansionBoardType::MAGNETIC_ENCODER.to_string(), "MagneticEncoder");
        assert_eq!(EncoderDirection::parse_text("sideways"), None);
    }
}
