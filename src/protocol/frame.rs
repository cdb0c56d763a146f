/* Wire frame: header, address-routed delivery, length field, 16-bit summation
 * checksum. */

/* Fixed two-byte frame header, always present before the address field. */
pub const HEADER: [u8; 2] = [0xEF, 0x01];

/* Minimum encoded frame size: header(2) + address(4) + pid(1) + length(2) + checksum(2). */
pub const MIN_FRAME_LEN: usize = 11;

/* Maximum payload size a single frame may carry. */
pub const MAX_PAYLOAD_LEN: usize = 253;

/* Packet identifier — the four-valued frame-type tag on the wire. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Pid {
    Command = 0x01,
    Data = 0x02,
    Ack = 0x07,
    EndOfData = 0x08,
}

impl Pid {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Command),
            0x02 => Some(Self::Data),
            0x07 => Some(Self::Ack),
            0x08 => Some(Self::EndOfData),
            _ => None,
        }
    }
}

/* Failure modes for [`Frame::decode`]. Internal to the reader: a decode failure never
 * surfaces past a `tracing::debug!` log line, since the reader resynchronises on the
 * next header regardless of cause. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame shorter than the minimum of {MIN_FRAME_LEN} bytes")]
    TooShort,
    #[error("frame header mismatch")]
    BadHeader,
    #[error("unrecognised packet identifier")]
    BadPid,
    #[error("length field / checksum mismatch")]
    Malformed,
}

/* One frame on the wire: `{address, pid, payload}`. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: u32,
    pub pid: Pid,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(address: u32, pid: Pid, payload: impl Into<Vec<u8>>) -> Self {
        Self { address, pid, payload: payload.into() }
    }

    /* Packet length field: payload plus the trailing 2-byte checksum. */
    fn length_field(&self) -> u16 {
        (self.payload.len() + 2) as u16
    }

    /* The bytes covered by the checksum: pid, length field, payload. Deliberately
     * excludes the header and address, matching the sensor firmware. */
    fn checksummed_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.payload.len());
        buf.push(self.pid as u8);
        buf.extend_from_slice(&self.length_field().to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /* 16-bit summation checksum, masked to 16 bits after summing (not before). */
    fn checksum(&self) -> u16 {
        let sum: u32 = self.checksummed_bytes().iter().map(|&b| b as u32).sum();
        (sum & 0xFFFF) as u16
    }

    /* Serialize into wire bytes: header, address, pid, length, payload, checksum. */
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MIN_FRAME_LEN + self.payload.len());
        buf.extend_from_slice(&HEADER);
        buf.extend_from_slice(&self.address.to_be_bytes());
        buf.extend_from_slice(&self.checksummed_bytes());
        buf.extend_from_slice(&self.checksum().to_be_bytes());
        buf
    }

    /* Parse a complete frame out of `data`. Returns `DecodeError` on any mismatch;
     * callers never need to distinguish the specific failure beyond logging it. */
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_FRAME_LEN {
            return Err(DecodeError::TooShort);
        }
        if data[0..2] != HEADER {
            return Err(DecodeError::BadHeader);
        }
        let pid = Pid::from_u8(data[6]).ok_or(DecodeError::BadPid)?;

        let address = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let length_field = u16::from_be_bytes([data[7], data[8]]);

        if data.len() < 9 + 2 {
            return Err(DecodeError::TooShort);
        }
        let payload = data[9..data.len() - 2].to_vec();

        let frame = Frame { address, pid, payload };

        if length_field != frame.length_field() {
            return Err(DecodeError::Malformed);
        }
        let trailer_checksum = u16::from_be_bytes([data[data.len() - 2], data[data.len() - 1]]);
        if trailer_checksum != frame.checksum() {
            return Err(DecodeError::Malformed);
        }
        Ok(frame)
    }
}
