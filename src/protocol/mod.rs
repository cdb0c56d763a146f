/* Wire protocol definitions shared across the frame codec, reader, and command
 * surface: the frame format, command opcodes, sensor status codes, and the
 * system parameters block. */
pub mod command;
pub mod error_code;
pub mod frame;
pub mod params;

pub use command::{BufferId, Command, ParameterId};
pub use error_code::ErrorCode;
pub use frame::{DecodeError, Frame, Pid, HEADER, MAX_PAYLOAD_LEN, MIN_FRAME_LEN};
pub use params::{Baudrate, PacketSize, ParamsError, Security, SystemParameters};

/* Default device address, broadcasting to any sensor on the bus. */
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/* Default device password. */
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/* Number of persistent user-storage pages on the sensor's notepad. */
pub const NOTEPAD_COUNT: u8 = 16;

/* Size in bytes of a single notepad page. */
pub const NOTEPAD_SIZE: usize = 32;

/* Fingerprint image raster dimensions produced by IMAGE_DOWNLOAD. */
pub const IMAGE_WIDTH: usize = 256;
pub const IMAGE_HEIGHT: usize = 288;
