use harp_message::PayloadType;

/// Element type of a register payload
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PayloadKind {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    Float,
}

impl PayloadKind {
    pub const fn payload_type(self) -> PayloadType {
        match self {
            Self::U8 => PayloadType::U8,
            Self::S8 => PayloadType::S8,
            Self::U16 => PayloadType::U16,
            Self::S16 => PayloadType::S16,
            Self::U32 => PayloadType::U32,
            Self::S32 => PayloadType::S32,
            Self::U64 => PayloadType::U64,
            Self::S64 => PayloadType::S64,
            Self::Float => PayloadType::Float,
        }
    }

    pub const fn from_payload_type(ty: PayloadType) -> Self {
        match ty {
            PayloadType::U8 => Self::U8,
            PayloadType::S8 => Self::S8,
            PayloadType::U16 => Self::U16,
            PayloadType::S16 => Self::S16,
            PayloadType::U32 => Self::U32,
            PayloadType::S32 => Self::S32,
            PayloadType::U64 => Self::U64,
            PayloadType::S64 => Self::S64,
            PayloadType::Float => Self::Float,
        }
    }

    pub fn width(self) -> usize {
        self.payload_type().width()
    }
}

/// How the raw elements of a payload are interpreted
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueShape {
    Scalar,
    Flags(&'static str),
    Enum(&'static str),
    /// Field names in wire order
    Composite(&'static [&'static str]),
}

/// A value that lives in a register payload: a fixed number of
/// little-endian elements of one kind.
pub trait PayloadValue: Copy + core::fmt::Debug + PartialEq + Sized {
    const KIND: PayloadKind;
    const LENGTH: u8;
    const SHAPE: ValueShape;

    /// Read from the start of `bytes`; `None` if there are not enough bytes.
    fn read(bytes: &[u8]) -> Option<Self>;

    fn write(&self, out: &mut Vec<u8>);

    fn to_text(&self) -> String;

    fn parse_text(text: &str) -> Option<Self>;

    fn byte_len() -> usize {
        Self::KIND.width() * usize::from(Self::LENGTH)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::byte_len());
        self.write(&mut out);
        out
    }
}

/// A decoded value paired with the message timestamp in seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timestamped<T> {
    pub seconds: f64,
    pub value: T,
}

impl<T> Timestamped<T> {
    pub fn new(seconds: f64, value: T) -> Self {
        Self { seconds, value }
    }
}

pub(crate) fn le_array<const N: usize>(bytes: &[u8], offset: usize) -> Option<[u8; N]> {
    bytes.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

macro_rules! int_payload {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl PayloadValue for $ty {
            const KIND: PayloadKind = PayloadKind::$kind;
            const LENGTH: u8 = 1;
            const SHAPE: ValueShape = ValueShape::Scalar;

            fn read(bytes: &[u8]) -> Option<Self> {
                le_array(bytes, 0).map(<$ty>::from_le_bytes)
            }

            fn write(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn parse_text(text: &str) -> Option<Self> {
                let t = text.trim();
                match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                    Some(hex) => <$ty>::from_str_radix(hex, 16).ok(),
                    None => t.parse().ok(),
                }
            }
        }
    )*};
}

int_payload! {
    u8 => U8,
    i8 => S8,
    u16 => U16,
    i16 => S16,
    u32 => U32,
    i32 => S32,
    u64 => U64,
    i64 => S64,
}

impl PayloadValue for f32 {
    const KIND: PayloadKind = PayloadKind::Float;
    const LENGTH: u8 = 1;
    const SHAPE: ValueShape = ValueShape::Scalar;

    fn read(bytes: &[u8]) -> Option<Self> {
        le_array(bytes, 0).map(f32::from_le_bytes)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_payload_type_widths() {
        assert_eq!(PayloadKind::U8.width(), 1);
        assert_eq!(PayloadKind::S16.width(), 2);
        assert_eq!(PayloadKind::Float.width(), 4);
        assert_eq!(PayloadKind::U64.width(), 8);
        for ty in PayloadType::ALL {
            assert_eq!(PayloadKind::from_payload_type(ty).payload_type(), ty);
        }
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(0x1234u16.to_bytes(), vec![0x34, 0x12]);
        assert_eq!((-2i16).to_bytes(), vec![0xFE, 0xFF]);
        assert_eq!(u32::read(&[0x78, 0x56, 0x34, 0x12]), Some(0x1234_5678));
        assert_eq!(1.0f32.to_bytes(), vec![0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn short_buffers_read_as_none() {
        assert_eq!(u16::read(&[0x01]), None);
        assert_eq!(f32::read(&[0, 0, 0]), None);
        assert_eq!(u8::read(&[]), None);
    }

    #[test]
    fn floats_are_bit_exact() {
        for v in [0.5f32, 1000.0, f32::MIN_POSITIVE, -0.0, 1.0e-7] {
            let back = f32::read(&v.to_bytes()).unwrap();
            assert_eq!(back.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn text_forms() {
        assert_eq!(u16::parse_text("0x9"), Some(9));
        assert_eq!(u16::parse_text(" 42 "), Some(42));
        assert_eq!(i16::parse_text("-300"), Some(-300));
        assert_eq!(u8::parse_text("256"), None);
        assert_eq!(f32::parse_text("0.5"), Some(0.5));
        assert_eq!(1000.0f32.to_text(), "1000");
    }
}
