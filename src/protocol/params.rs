/* System parameter block returned by PARAMETERS_GET and the small enums used
 * to interpret its fields. */

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("system parameters block must be 16 bytes, got {0}")]
    WrongSize(usize),
    #[error("security level {0} out of range 1..=5")]
    BadSecurity(u16),
    #[error("packet size code {0} not one of 0..=3")]
    BadPacketSize(u16),
    #[error("baudrate code {0} out of range 1..=12")]
    BadBaudrate(u16),
}

/* Data packet size used when fragmenting bulk transfers, encoded on the wire
 * as a 2-bit code (0..3) and expanded here to the byte count it represents. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PacketSize {
    Bytes32 = 0,
    Bytes64 = 1,
    Bytes128 = 2,
    Bytes256 = 3,
}

impl PacketSize {
    pub fn from_code(code: u16) -> Result<Self, ParamsError> {
        match code {
            0 => Ok(Self::Bytes32),
            1 => Ok(Self::Bytes64),
            2 => Ok(Self::Bytes128),
            3 => Ok(Self::Bytes256),
            other => Err(ParamsError::BadPacketSize(other)),
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /* Number of payload bytes per DATA/END_OF_DATA fragment. */
    pub fn byte_count(self) -> usize {
        match self {
            Self::Bytes32 => 32,
            Self::Bytes64 => 64,
            Self::Bytes128 => 128,
            Self::Bytes256 => 256,
        }
    }
}

/* Matching-stringency setting, 1 (loosest) through 5 (strictest). */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Security(u16);

impl Security {
    pub fn new(level: u16) -> Result<Self, ParamsError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ParamsError::BadSecurity(level))
        }
    }

    pub fn level(self) -> u16 {
        self.0
    }
}

/* Serial baudrate, encoded on the wire as a multiple of 9600 in range 1..=12. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baudrate(u16);

impl Baudrate {
    pub fn from_code(code: u16) -> Result<Self, ParamsError> {
        if (1..=12).contains(&code) {
            Ok(Self(code))
        } else {
            Err(ParamsError::BadBaudrate(code))
        }
    }

    /* Build from an actual bps value (must be an exact multiple of 9600). */
    pub fn from_bps(bps: u32) -> Result<Self, ParamsError> {
        if bps == 0 || bps % 9600 != 0 {
            return Err(ParamsError::BadBaudrate((bps / 9600) as u16));
        }
        Self::from_code((bps / 9600) as u16)
    }

    pub fn code(self) -> u16 {
        self.0
    }

    pub fn bps(self) -> u32 {
        9600 * u32::from(self.0)
    }
}

/* 16-byte system parameters block: status(2) id(2) capacity(2) security(2)
 * address(4) packet_size(2) baudrate(2), all big-endian. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    pub status: u16,
    pub sensor_id: u16,
    pub capacity: u16,
    pub security: Security,
    pub address: u32,
    pub packet_size: PacketSize,
    pub baudrate: Baudrate,
}

impl SystemParameters {
    pub fn decode(data: &[u8]) -> Result<Self, ParamsError> {
        if data.len() != 16 {
            return Err(ParamsError::WrongSize(data.len()));
        }
        let status = u16::from_be_bytes([data[0], data[1]]) & 0x000F;
        let sensor_id = u16::from_be_bytes([data[2], data[3]]);
        let capacity = u16::from_be_bytes([data[4], data[5]]);
        let security = Security::new(u16::from_be_bytes([data[6], data[7]]))?;
        let address = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let packet_size = PacketSize::from_code(u16::from_be_bytes([data[12], data[13]]))?;
        let baudrate = Baudrate::from_code(u16::from_be_bytes([data[14], data[15]]))?;
        Ok(Self { status, sensor_id, capacity, security, address, packet_size, baudrate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x00FFu16.to_be_bytes()); // status, masked to 0x0F
        buf.extend_from_slice(&0x0001u16.to_be_bytes()); // id
        buf.extend_from_slice(&200u16.to_be_bytes()); // capacity
        buf.extend_from_slice(&3u16.to_be_bytes()); // security
        buf.extend_from_slice(&0xFFFFFFFFu32.to_be_bytes()); // address
        buf.extend_from_slice(&2u16.to_be_bytes()); // packet_size code -> 128
        buf.extend_from_slice(&6u16.to_be_bytes()); // baudrate code -> 57600
        buf
    }

    #[test]
    fn decodes_sample_block() {
        let params = SystemParameters::decode(&sample_bytes()).expect("valid block");
        assert_eq!(params.status, 0x000F);
        assert_eq!(params.capacity, 200);
        assert_eq!(params.security.level(), 3);
        assert_eq!(params.packet_size.byte_count(), 128);
        assert_eq!(params.baudrate.bps(), 57600);
    }

    #[test]
    fn rejects_wrong_size() {
        assert_eq!(SystemParameters::decode(&[0; 10]), Err(ParamsError::WrongSize(10)));
    }

    #[test]
    fn rejects_out_of_range_security() {
        let mut bytes = sample_bytes();
        bytes[6..8].copy_from_slice(&0u16.to_be_bytes());
        assert_eq!(SystemParameters::decode(&bytes), Err(ParamsError::BadSecurity(0)));
    }

    #[test]
    fn baudrate_from_bps_requires_exact_multiple() {
        assert_eq!(Baudrate::from_bps(57600).unwrap().code(), 6);
        assert!(Baudrate::from_bps(57601).is_err());
    }
}
