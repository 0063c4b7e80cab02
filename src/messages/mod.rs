//! Specific AIS message types
use crate::errors::*;
use nom::bits::complete::take as take_bits;
use nom::IResult;
use std::cmp;

pub mod addressed_safety_related;
pub mod aid_to_navigation_report;
pub mod assignment_mode_command;
pub mod base_station_report;
pub mod binary_acknowledge;
pub mod binary_addressed;
pub mod binary_broadcast_message;
pub mod data_link_management_message;
pub mod dgnss_broadcast_binary_message;
pub mod extended_class_b_position_report;
pub mod group_assignment_command;
pub mod interrogation;
pub mod long_range_ais_broadcast;
pub mod navigation;
pub mod parsers;
pub mod position_report;
mod radio_status;
pub mod safety_related_acknowledgment;
pub mod safety_related_broadcast;
pub mod standard_aircraft_position_report;
pub mod standard_class_b_position_report;
pub mod static_and_voyage_related_data;
pub mod static_data_report;
pub mod tag_block;
pub mod types;
pub mod utc_date_inquiry;
pub mod utc_date_response;

#[cfg(all(not(feature = "std"), not(feature = "alloc")))]
mod nom_noalloc;

pub use navigation::{Accuracy, Direction, RateOfTurn};

/// A type for storing number of bits. (AIS is a bit-oriented, rather than byte-oriented protocol.)
pub type BitCount = usize;
/// Denotes data to be parsed byte-by-byte
pub type ByteStream<'a> = &'a [u8];
/// Denotes data to be parsed bit-by-bit
pub type BitStream<'a> = &'a [u8];

/// Common interface implemented by every structured AIS message type.
pub trait AisMessageType<'a>: Sized {
    /// A human-readable name for the message, for logging/debugging.
    fn name(&self) -> &'static str;
    /// Parses a message from an unarmored bitstream, assuming the leading
    /// 6-bit type field and 2-bit repeat indicator are still present.
    fn parse(data: &'a [u8]) -> Result<Self>;
}

/// Contains all structured messages recognized by this crate, keyed by their
/// ITU-R M.1371 message type number.
#[derive(Debug)]
pub enum AisMessage {
    PositionReport(position_report::PositionReport),
    BaseStationReport(base_station_report::BaseStationReport),
    StaticAndVoyageRelatedData(static_and_voyage_related_data::StaticAndVoyageRelatedData),
    BinaryAddressedMessage(binary_addressed::BinaryAddressedMessage),
    BinaryAcknowledge(binary_acknowledge::BinaryAcknowledge),
    BinaryBroadcastMessage(binary_broadcast_message::BinaryBroadcastMessage),
    StandardSarAircraftPositionReport(standard_aircraft_position_report::SARPositionReport),
    UtcDateInquiry(utc_date_inquiry::UtcDateInquiry),
    UtcDateResponse(utc_date_response::UtcDateResponse),
    AddressedSafetyRelatedMessage(addressed_safety_related::AddressedSafetyRelatedMessage),
    SafetyRelatedAcknowledge(safety_related_acknowledgment::SafetyRelatedAcknowledge),
    SafetyRelatedBroadcastMessage(safety_related_broadcast::SafetyRelatedBroadcastMessage),
    Interrogation(interrogation::Interrogation),
    AssignmentModeCommand(assignment_mode_command::AssignmentModeCommand),
    DgnssBroadcastBinaryMessage(dgnss_broadcast_binary_message::DgnssBroadcastBinaryMessage),
    StandardClassBPositionReport(standard_class_b_position_report::StandardClassBPositionReport),
    ExtendedClassBPositionReport(extended_class_b_position_report::ExtendedClassBPositionReport),
    DataLinkManagementMessage(data_link_management_message::DataLinkManagementMessage),
    AidToNavigationReport(aid_to_navigation_report::AidToNavigationReport),
    GroupAssignmentCommand(group_assignment_command::GroupAssignmentCommand),
    StaticDataReport(static_data_report::StaticDataReport),
    LongRangeAisBroadcastMessage(long_range_ais_broadcast::LongRangeAisBroadcastMessage),
}

impl AisMessage {
    /// The MMSI of the reporting (or addressed) station. Every implemented
    /// message type carries one in its first 30 payload bits after the
    /// 6-bit type and 2-bit repeat indicator.
    pub fn mmsi(&self) -> u32 {
        match self {
            AisMessage::PositionReport(m) => m.mmsi,
            AisMessage::BaseStationReport(m) => m.mmsi,
            AisMessage::StaticAndVoyageRelatedData(m) => m.mmsi,
            AisMessage::BinaryAddressedMessage(m) => m.mmsi,
            AisMessage::BinaryAcknowledge(m) => m.mmsi,
            AisMessage::BinaryBroadcastMessage(m) => m.mmsi,
            AisMessage::StandardSarAircraftPositionReport(m) => m.mmsi,
            AisMessage::UtcDateInquiry(m) => m.mmsi,
            AisMessage::UtcDateResponse(m) => m.mmsi,
            AisMessage::AddressedSafetyRelatedMessage(m) => m.mmsi,
            AisMessage::SafetyRelatedAcknowledge(m) => m.mmsi,
            AisMessage::SafetyRelatedBroadcastMessage(m) => m.mmsi,
            AisMessage::Interrogation(m) => m.mmsi,
            AisMessage::AssignmentModeCommand(m) => m.mmsi,
            AisMessage::DgnssBroadcastBinaryMessage(m) => m.mmsi,
            AisMessage::StandardClassBPositionReport(m) => m.mmsi,
            AisMessage::ExtendedClassBPositionReport(m) => m.mmsi,
            AisMessage::DataLinkManagementMessage(m) => m.mmsi,
            AisMessage::AidToNavigationReport(m) => m.mmsi,
            AisMessage::GroupAssignmentCommand(m) => m.mmsi,
            AisMessage::StaticDataReport(m) => m.mmsi,
            AisMessage::LongRangeAisBroadcastMessage(m) => m.mmsi,
        }
    }
}

fn message_type(data: (&[u8], usize)) -> IResult<(&[u8], usize), u8> {
    nom::combinator::peek(take_bits::<_, u8, _, (_, _)>(6u8))(data)
}

/// Given an unarmored bitstream (see `unarmor()` for details), this
/// will return a message type object, if supported by this library
/// and the message is valid. Unsupported (but structurally valid) AIS
/// types produce an error rather than a panic: callers treat the decoder
/// as a fallible black box.
pub fn parse(unarmored: BitStream) -> Result<AisMessage> {
    let (_, type_id) = message_type((unarmored, 0))?;
    match type_id {
        1..=3 => Ok(AisMessage::PositionReport(
            position_report::PositionReport::parse(unarmored)?,
        )),
        4 => Ok(AisMessage::BaseStationReport(
            base_station_report::BaseStationReport::parse(unarmored)?,
        )),
        5 => Ok(AisMessage::StaticAndVoyageRelatedData(
            static_and_voyage_related_data::StaticAndVoyageRelatedData::parse(unarmored)?,
        )),
        6 => Ok(AisMessage::BinaryAddressedMessage(
            binary_addressed::BinaryAddressedMessage::parse(unarmored)?,
        )),
        7 => Ok(AisMessage::BinaryAcknowledge(
            binary_acknowledge::BinaryAcknowledge::parse(unarmored)?,
        )),
        8 => Ok(AisMessage::BinaryBroadcastMessage(
            binary_broadcast_message::BinaryBroadcastMessage::parse(unarmored)?,
        )),
        9 => Ok(AisMessage::StandardSarAircraftPositionReport(
            standard_aircraft_position_report::SARPositionReport::parse(unarmored)?,
        )),
        10 => Ok(AisMessage::UtcDateInquiry(
            utc_date_inquiry::UtcDateInquiry::parse(unarmored)?,
        )),
        11 => Ok(AisMessage::UtcDateResponse(
            utc_date_response::UtcDateResponse::parse(unarmored)?,
        )),
        12 => Ok(AisMessage::AddressedSafetyRelatedMessage(
            addressed_safety_related::AddressedSafetyRelatedMessage::parse(unarmored)?,
        )),
        13 => Ok(AisMessage::SafetyRelatedAcknowledge(
            safety_related_acknowledgment::SafetyRelatedAcknowledge::parse(unarmored)?,
        )),
        14 => Ok(AisMessage::SafetyRelatedBroadcastMessage(
            safety_related_broadcast::SafetyRelatedBroadcastMessage::parse(unarmored)?,
        )),
        15 => Ok(AisMessage::Interrogation(
            interrogation::Interrogation::parse(unarmored)?,
        )),
        16 => Ok(AisMessage::AssignmentModeCommand(
            assignment_mode_command::AssignmentModeCommand::parse(unarmored)?,
        )),
        17 => Ok(AisMessage::DgnssBroadcastBinaryMessage(
            dgnss_broadcast_binary_message::DgnssBroadcastBinaryMessage::parse(unarmored)?,
        )),
        18 => Ok(AisMessage::StandardClassBPositionReport(
            standard_class_b_position_report::StandardClassBPositionReport::parse(unarmored)?,
        )),
        19 => Ok(AisMessage::ExtendedClassBPositionReport(
            extended_class_b_position_report::ExtendedClassBPositionReport::parse(unarmored)?,
        )),
        20 => Ok(AisMessage::DataLinkManagementMessage(
            data_link_management_message::DataLinkManagementMessage::parse(unarmored)?,
        )),
        21 => Ok(AisMessage::AidToNavigationReport(
            aid_to_navigation_report::AidToNavigationReport::parse(unarmored)?,
        )),
        23 => Ok(AisMessage::GroupAssignmentCommand(
            group_assignment_command::GroupAssignmentCommand::parse(unarmored)?,
        )),
        24 => Ok(AisMessage::StaticDataReport(
            static_data_report::StaticDataReport::parse(unarmored)?,
        )),
        27 => Ok(AisMessage::LongRangeAisBroadcastMessage(
            long_range_ais_broadcast::LongRangeAisBroadcastMessage::parse(unarmored)?,
        )),
        _ => Err(format!("Unimplemented type: {}", type_id).into()),
    }
}

#[inline]
fn sixbit_to_ascii(data: u8) -> Result<u8> {
    match data {
        0..=31 => Ok(data + 64),
        32..=63 => Ok(data),
        _ => Err(format!("Illegal 6-bit character: {}", data).into()),
    }
}

#[inline]
fn u8_to_bool(data: u8) -> Result<bool> {
    match data {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(format!("Invalid boolean value: {}", data).into()),
    }
}

fn signed_i32(input: (&[u8], usize), len: usize) -> IResult<(&[u8], usize), i32> {
    assert!(len <= std::mem::size_of::<i32>() * 8);
    let (input, value) = take_bits::<_, i32, _, (_, _)>(len)(input)?;
    let mask = !0i32 << len;
    let result = match (value << (32 - len)).leading_zeros() {
        0 => value | mask,
        _ => !mask & value,
    };
    Ok((input, result))
}

/// Converts 8-bit ASCII (armored) into packed 6-bit (unarmored) sequences.
///
/// AIS data is bit-, not byte-oriented. AIS data is split into 6-bit chunks,
/// which are then represented in ASCII as 8-bit characters. That process
/// is called "armoring"
///
/// The `fill_bits` parameter is a count of bits needed to pad
/// the complete message out to a 6-bit boundary. It should be supplied
/// as part of the main sentence.
///
/// Returns an error if any of the individual bytes cannot be converted
/// to a valid 6-bit chunk.
///
/// See https://gpsd.gitlab.io/gpsd/AIVDM.html for more details.
pub fn unarmor(data: ByteStream, fill_bits: BitCount) -> Result<Vec<u8>> {
    let bit_count = data.len() * 6;
    let byte_count = (bit_count / 8) + ((bit_count % 8 != 0) as usize);
    let mut output = vec![0; byte_count];
    let mut offset = 0;
    for byte in data {
        let unarmored = match *byte {
            48..=87 => byte - 48,
            96..=119 => byte - 56,
            _ => return Err(format!("Value out of range: {}", byte).into()),
        } << 2;
        let offset_byte = offset / 8;
        let offset_bit = offset % 8;
        output[offset_byte] |= unarmored >> offset_bit;
        if offset_bit > 2 {
            // Continue into the next byte
            output[offset_byte + 1] |= unarmored << (8 - offset_bit);
        }
        offset += 6;
    }
    if fill_bits != 0 {
        let bits_in_final_byte = match bit_count % 8 {
            0 => 8,
            1..=7 => bit_count % 8,
            _ => unreachable!(),
        };
        let final_idx = output.len() - 1;
        {
            let byte = &mut output[final_idx];
            let shift = (8 - bits_in_final_byte) + cmp::min(fill_bits, bits_in_final_byte);
            *byte &= match shift {
                0..=7 => 0xffu8 << shift,
                8 => 0x0u8,
                _ => unreachable!(),
            };
        }
        if fill_bits > bits_in_final_byte {
            let byte = &mut output[final_idx - 1];
            *byte &= 0xffu8 << (fill_bits - bits_in_final_byte);
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmor_single_byte() {
        let input = b"9";
        let result = unarmor(input, 0).unwrap();
        assert_eq!([0b0010_0100,], &result[..]);
    }

    #[test]
    fn unarmor_single_byte_fill() {
        let input = b"9";
        let result = unarmor(input, 4).unwrap();
        assert_eq!([0b0000_0000,], &result[..]);
    }

    #[test]
    fn unarmor_multi_bytes_unaligned() {
        let input = b"9q";
        let result = unarmor(input, 0).unwrap();
        assert_eq!([0b0010_0111, 0b1001_0000,], &result[..]);
    }

    #[test]
    fn unarmor_multi_bytes_aligned() {
        let input = b"9qKr";
        let result = unarmor(input, 0).unwrap();
        assert_eq!([0b0010_0111, 0b1001_0110, 0b0_1111_1010], &result[..]);
    }

    #[test]
    fn unarmor_multi_bytes_aligned_fill() {
        let input = b"9qWr";
        let result = unarmor(input, 4).unwrap();
        assert_eq!([0b0010_0111, 0b1001_1001, 0b1111_0000], &result[..]);
    }

    #[test]
    fn unarmor_multi_bytes_unaligned_fill() {
        let input = b"9qW";
        let result = unarmor(input, 3).unwrap();
        assert_eq!([0b0010_0111, 0b1001_1000, 0b0000_0000], &result[..]);
    }

    #[test]
    fn dispatch_position_report() {
        let bytestream = b"13u?etPv2;0n:dDPwUM1U1Cb069D";
        let bitstream = unarmor(bytestream, 0).unwrap();
        let message = parse(&bitstream).unwrap();
        assert!(matches!(message, AisMessage::PositionReport(_)));
        assert_eq!(message.mmsi(), 265547250);
    }

    #[test]
    fn dispatch_unimplemented_type_is_an_error() {
        // Type 22 (channel management) isn't implemented by this decoder.
        let mut raw = vec![0u8; 4];
        raw[0] = 22 << 2;
        let message = parse(&raw);
        assert!(message.is_err());
    }
}
