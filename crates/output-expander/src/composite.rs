//! Multi-element payloads. Field order is the wire order.

use crate::payload::{le_array, PayloadKind, PayloadValue, ValueShape};

/// Absolute angle and field magnitude reported by the magnetic encoder board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MagneticEncoderPayload {
    pub angle: u16,
    pub magnitude: u16,
}

/// Motion delta and surface quality reported by the optical flow board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpticalFlowPayload {
    pub delta_x: i16,
    pub delta_y: i16,
    pub squal: i16,
}

fn split_fields<const N: usize>(text: &str) -> Option<[&str; N]> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    parts.try_into().ok()
}

impl PayloadValue for MagneticEncoderPayload {
    const KIND: PayloadKind = PayloadKind::U16;
    const LENGTH: u8 = 2;
    const SHAPE: ValueShape = ValueShape::Composite(&["angle", "magnitude"]);

    fn read(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            angle: u16::from_le_bytes(le_array(bytes, 0)?),
            magnitude: u16::from_le_bytes(le_array(bytes, 2)?),
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.angle.write(out);
        self.magnitude.write(out);
    }

    fn to_text(&self) -> String {
        format!("{},{}", self.angle, self.magnitude)
    }

    fn parse_text(text: &str) -> Option<Self> {
        let [angle, magnitude] = split_fields(text)?;
        Some(Self {
            angle: u16::parse_text(angle)?,
            magnitude: u16::parse_text(magnitude)?,
        })
    }
}

impl PayloadValue for OpticalFlowPayload {
    const KIND: PayloadKind = PayloadKind::S16;
    const LENGTH: u8 = 3;
    const SHAPE: ValueShape = ValueShape::Composite(&["delta_x", "delta_y", "squal"]);

    fn read(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            delta_x: i16::from_le_bytes(le_array(bytes, 0)?),
            delta_y: i16::from_le_bytes(le_array(bytes, 2)?),
            squal: i16::from_le_bytes(le_array(bytes, 4)?),
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.delta_x.write(out);
        self.delta_y.write(out);
        self.squal.write(out);
    }

    fn to_text(&self) -> String {
        format!("{},{},{}", self.delta_x, self.delta_y, self.squal)
    }

    fn parse_text(text: &str) -> Option<Self> {
        let [delta_x, delta_y, squal] = split_fields(text)?;
        Some(Self {
            delta_x: i16::parse_text(delta_x)?,
            delta_y: i16::parse_text(delta_y)?,
            squal: i16::parse_text(squal)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnetic_encoder_keeps_field_order() {
        let value = MagneticEncoderPayload {
            angle: 4096,
            magnitude: 200,
        };
        let bytes = value.to_bytes();
        assert_eq!(bytes, vec![0x00, 0x10, 0xC8, 0x00]);
        let back = MagneticEncoderPayload::read(&bytes).unwrap();
        assert_eq!(back.angle, 4096);
        assert_eq!(back.magnitude, 200);
    }

    #[test]
    fn optical_flow_keeps_order_and_sign() {
        let value = OpticalFlowPayload {
            delta_x: -5,
            delta_y: 300,
            squal: -1,
        };
        let bytes = value.to_bytes();
        assert_eq!(bytes, vec![0xFB, 0xFF, 0x2C, 0x01, 0xFF, 0xFF]);
        assert_eq!(OpticalFlowPayload::read(&bytes), Some(value));
        assert_eq!(OpticalFlowPayload::byte_len(), 6);
    }

    #[test]
    fn truncated_composite_reads_as_none() {
        assert_eq!(MagneticEncoderPayload::read(&[0x00, 0x10, 0xC8]), None);
        assert_eq!(OpticalFlowPayload::read(&[0; 4]), None);
    }

    #[test]
    fn composite_text() {
        let value = MagneticEncoderPayload::parse_text("4096, 200").unwrap();
        assert_eq!(value.angle, 4096);
        assert_eq!(value.magnitude, 200);
        assert_eq!(value.to_text(), "4096,200");
        assert_eq!(
            OpticalFlowPayload::parse_text("-5 300 -1"),
            Some(OpticalFlowPayload {
                delta_x: -5,
                delta_y: 300,
                squal: -1,
            })
        );
        assert_eq!(MagneticEncoderPayload::parse_text("1,2,3"), None);
    }
}
