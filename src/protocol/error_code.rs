/* Sensor status byte carried in `ack.payload[0]`, covering the full space
 * documented by the device firmware. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0x00,

    PacketTransmission = 0x01,
    FingerNotInSensor = 0x02,
    FingerEnrollFailed = 0x03,

    ImageMessy = 0x06,
    ImageFewFeaturePoints = 0x07,
    FingerMismatch = 0x08,
    FingerNotFound = 0x09,
    CharacteristicsMismatch = 0x0A,

    TemplateInvalidIndex = 0x0B,
    TemplateLoad = 0x0C,
    TemplateDownload = 0x0D,
    PacketModuleReception = 0x0E,
    ImageDownload = 0x0F,

    TemplateDelete = 0x10,
    TemplateEmpty = 0x11,

    Flash = 0x18,
    Undefined = 0x19,

    SystemInvalidRegister = 0x1A,
    SystemInvalidConfiguration = 0x1B,
    NotepadInvalidPage = 0x1C,
    CommunicationPort = 0x1D,

    ImageInvalid = 0x15,

    Address = 0x20,
    PasswordVerify = 0x21,

    /* Accepted as a success code for every command, not only HANDSHAKE. */
    HandshakeSuccess = 0x55,

    PacketFaulty = 0xFE,
    Timeout = 0xFF,
}

impl ErrorCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Success,
            0x01 => Self::PacketTransmission,
            0x02 => Self::FingerNotInSensor,
            0x03 => Self::FingerEnrollFailed,
            0x06 => Self::ImageMessy,
            0x07 => Self::ImageFewFeaturePoints,
            0x08 => Self::FingerMismatch,
            0x09 => Self::FingerNotFound,
            0x0A => Self::CharacteristicsMismatch,
            0x0B => Self::TemplateInvalidIndex,
            0x0C => Self::TemplateLoad,
            0x0D => Self::TemplateDownload,
            0x0E => Self::PacketModuleReception,
            0x0F => Self::ImageDownload,
            0x10 => Self::TemplateDelete,
            0x11 => Self::TemplateEmpty,
            0x15 => Self::ImageInvalid,
            0x18 => Self::Flash,
            0x19 => Self::Undefined,
            0x1A => Self::SystemInvalidRegister,
            0x1B => Self::SystemInvalidConfiguration,
            0x1C => Self::NotepadInvalidPage,
            0x1D => Self::CommunicationPort,
            0x20 => Self::Address,
            0x21 => Self::PasswordVerify,
            0x55 => Self::HandshakeSuccess,
            0xFE => Self::PacketFaulty,
            _ => Self::Timeout,
        }
    }

    /* True for the two status bytes the sensor uses to mean "command accepted". */
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::HandshakeSuccess)
    }

    /* True for image-conversion failures a caller is expected to retry by
     * recapturing the image. Retrying is the caller's decision; this crate
     * only classifies the error. */
    pub fn is_retryable_image_error(self) -> bool {
        matches!(self, Self::ImageMessy | Self::ImageFewFeaturePoints | Self::ImageInvalid)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} (0x{:02X})", *self as u8)
    }
}
