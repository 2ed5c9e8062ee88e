// CAN protocol for register access and motor commands

use crate::control::{ControlProcessState, ControlStatus, Fault};

/// CAN message IDs
pub mod can_ids {
    /// Register write (addr: u8, value: u16 LE, 3 bytes)
    pub const REGISTER_WRITE: u32 = 0x300;

    /// Register read request (addr: u8, 1 byte)
    pub const REGISTER_READ: u32 = 0x301;

    /// Ignite command (any data length)
    pub const IGNITE: u32 = 0x302;

    /// Kill command (any data length)
    pub const KILL: u32 = 0x303;

    /// Emergency stop (any data length), handled as kill
    pub const EMERGENCY_STOP: u32 = 0x000;

    /// Register value reply (addr: u8, value: u16 LE, 3 bytes)
    pub const REGISTER_VALUE: u32 = 0x380;

    /// Control status (state, fault, period, crossing, lost; 8 bytes)
    pub const STATUS: u32 = 0x381;
}

/// Host command decoded from a CAN frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    WriteRegister { addr: u8, value: u16 },
    ReadRegister { addr: u8 },
    Ignite,
    Kill,
}

/// Decode a received frame into a command
///
/// # Returns
/// * `None` if the ID is not a command or the data is too short
pub fn parse_command(id: u32, data: &[u8]) -> Option<Command> {
    match id {
        can_ids::REGISTER_WRITE => {
            parse_register_write(data).map(|(addr, value)| Command::WriteRegister { addr, value })
        }
        can_ids::REGISTER_READ => parse_register_read(data).map(|addr| Command::ReadRegister { addr }),
        can_ids::IGNITE => Some(Command::Ignite),
        can_ids::KILL | can_ids::EMERGENCY_STOP => Some(Command::Kill),
        _ => None,
    }
}

/// Parse register write request from CAN data
///
/// # Arguments
/// * `data` - CAN frame data (should be 3 bytes)
///
/// # Returns
/// * `Some((addr, value))` if parsing successful
/// * `None` if data length is incorrect
pub fn parse_register_write(data: &[u8]) -> Option<(u8, u16)> {
    if data.len() < 3 {
        error!("Register write: invalid data length {}", data.len());
        return None;
    }

    let addr = data[0];
    let value = u16::from_le_bytes([data[1], data[2]]);

    info!("Register write received: {:#x} = {}", addr, value);
    Some((addr, value))
}

/// Parse register read request from CAN data
pub fn parse_register_read(data: &[u8]) -> Option<u8> {
    if data.is_empty() {
        error!("Register read: no data");
        return None;
    }
    Some(data[0])
}

/// Encode a register value reply
pub fn encode_register_value(addr: u8, value: u16) -> [u8; 3] {
    let value = value.to_le_bytes();
    [addr, value[0], value[1]]
}

/// Encode control status into CAN data
///
/// Layout: state, fault (0 = none), period (u16 LE), crossing counter (u16 LE),
/// lost crossing counter (u16 LE). Counters saturate at `u16::MAX`.
pub fn encode_status(status: &ControlStatus) -> [u8; 8] {
    let mut data = [0u8; 8];

    data[0] = status.state as u8;
    data[1] = status.fault.map_or(0, |f| f as u8);
    data[2..4].copy_from_slice(&status.period.to_le_bytes());
    data[4..6].copy_from_slice(&saturate(status.bemf_crossing_counter).to_le_bytes());
    data[6..8].copy_from_slice(&saturate(status.bemf_lost_crossing_counter).to_le_bytes());

    data
}

/// Decode control status from CAN data
///
/// # Returns
/// * `None` if data length is incorrect or a field is out of range
pub fn decode_status(data: &[u8]) -> Option<ControlStatus> {
    if data.len() < 8 {
        return None;
    }

    let state = ControlProcessState::try_from(data[0]).ok()?;
    let fault = match data[1] {
        0 => None,
        1 => Some(Fault::CrossingLost),
        2 => Some(Fault::Fatal),
        _ => return None,
    };

    Some(ControlStatus {
        state,
        fault,
        period: u16::from_le_bytes([data[2], data[3]]),
        bemf_crossing_counter: u16::from_le_bytes([data[4], data[5]]) as u32,
        bemf_lost_crossing_counter: u16::from_le_bytes([data[6], data[7]]) as u32,
    })
}

fn saturate(value: u32) -> u16 {
    value.min(u16::MAX as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_write() {
        let data = [0x04, 0x34, 0x12];
        assert_eq!(parse_register_write(&data), Some((0x04, 0x1234)));
        assert_eq!(parse_register_write(&data[..2]), None);
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command(can_ids::REGISTER_WRITE, &[0x00, 0x10, 0x27]),
            Some(Command::WriteRegister {
                addr: 0x00,
                value: 10_000
            })
        );
        assert_eq!(
            parse_command(can_ids::REGISTER_READ, &[0x11]),
            Some(Command::ReadRegister { addr: 0x11 })
        );
        assert_eq!(parse_command(can_ids::REGISTER_READ, &[]), None);
        assert_eq!(parse_command(can_ids::IGNITE, &[]), Some(Command::Ignite));
        assert_eq!(parse_command(can_ids::KILL, &[1]), Some(Command::Kill));
        assert_eq!(parse_command(can_ids::EMERGENCY_STOP, &[]), Some(Command::Kill));
        assert_eq!(parse_command(can_ids::STATUS, &[0; 8]), None);
    }

    #[test]
    fn test_encode_register_value() {
        assert_eq!(encode_register_value(0x01, 0xFFEC), [0x01, 0xEC, 0xFF]);
    }

    #[test]
    fn test_encode_decode_status() {
        let status = ControlStatus {
            state: ControlProcessState::Error,
            fault: Some(Fault::CrossingLost),
            bemf_crossing_counter: 70_000,
            bemf_lost_crossing_counter: 11,
            period: 4321,
        };

        let encoded = encode_status(&status);
        assert_eq!(encoded[0], 0);
        assert_eq!(encoded[1], 1);

        let decoded = decode_status(&encoded).unwrap();
        assert_eq!(decoded.state, ControlProcessState::Error);
        assert_eq!(decoded.fault, Some(Fault::CrossingLost));
        assert_eq!(decoded.period, 4321);
        assert_eq!(decoded.bemf_crossing_counter, u16::MAX as u32);
        assert_eq!(decoded.bemf_lost_crossing_counter, 11);
    }

    #[test]
    fn test_decode_status_rejects_bad_fields() {
        assert_eq!(decode_status(&[1, 0, 0, 0]), None);
        assert_eq!(decode_status(&[9, 0, 0, 0, 0, 0, 0, 0]), None);
        assert_eq!(decode_status(&[1, 7, 0, 0, 0, 0, 0, 0]), None);
    }
}
