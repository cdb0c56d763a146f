/* Hardware random number generator. */
use crate::engine::Driver;
use crate::error::Result;
use crate::protocol::Command;

impl Driver {
    /// Generate a random 32-bit number using the sensor's RNG.
    pub async fn random_get(&self) -> Result<u32> {
        let _lock = self.serialize_commands().await;
        let (ack, _) = self.command_get(Command::RandomGet.opcode(), &[], false).await?;
        Ok(u32::from_be_bytes([ack.payload[1], ack.payload[2], ack.payload[3], ack.payload[4]]))
    }
}
