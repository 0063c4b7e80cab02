use crate::errors::*;
use nom::bits::complete::take as take_bits;
use nom::combinator::{map, map_res};
use nom::IResult;

#[derive(Debug, PartialEq)]
pub enum RadioStatus {
    Sotdma(SotdmaMessage),
    Itdma(ItdmaMessage),
}

#[derive(Debug, PartialEq)]
pub enum SyncState {
    UtcDirect,
    UtcIndirect,
    BaseStation,
    NumberOfReceivedStations,
}

impl SyncState {
    pub fn parse(data: u8) -> Result<Self> {
        match data {
            0 => Ok(SyncState::UtcDirect),
            1 => Ok(SyncState::UtcIndirect),
            2 => Ok(SyncState::BaseStation),
            3 => Ok(SyncState::NumberOfReceivedStations),
            _ => Err(format!("Unknown sync state: {}", data).into()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum SubMessage {
    SlotOffset(i16),
    UtcHourAndMinute(u8, u8),
    SlotNumber(u16),
    ReceivedStations(u16),
}

impl SubMessage {
    fn parse(
        data: (&[u8], usize),
        slot_timeout: u8,
    ) -> IResult<(&[u8], usize), SubMessage> {
        match slot_timeout {
            0 => map(slot_offset, SubMessage::SlotOffset)(data),
            1 => map(utc_hour_and_minute, |(h, m)| {
                SubMessage::UtcHourAndMinute(h, m)
            })(data),
            2 | 4 | 6 => map(subm_u16, SubMessage::SlotNumber)(data),
            3 | 5 | 7 => map(subm_u16, SubMessage::ReceivedStations)(data),
            _ => unreachable!(),
        }
    }
}

fn utc_hour_and_minute(data: (&[u8], usize)) -> IResult<(&[u8], usize), (u8, u8)> {
    let (data, hour) = take_bits::<_, u8, _, (_, _)>(5u8)(data)?;
    let (data, _) = take_bits::<_, u8, _, (_, _)>(1u8)(data)?;
    let (data, minute) = take_bits::<_, u8, _, (_, _)>(6u8)(data)?;
    let (data, _) = take_bits::<_, u8, _, (_, _)>(2u8)(data)?;
    Ok((data, (hour, minute)))
}

fn slot_offset(data: (&[u8], usize)) -> IResult<(&[u8], usize), i16> {
    take_bits::<_, i16, _, (_, _)>(14u8)(data)
}

fn subm_u16(data: (&[u8], usize)) -> IResult<(&[u8], usize), u16> {
    take_bits::<_, u16, _, (_, _)>(14u8)(data)
}

#[derive(Debug, PartialEq)]
pub struct SotdmaMessage {
    pub sync_state: SyncState,
    pub slot_timeout: u8,
    pub sub_message: SubMessage,
}

impl SotdmaMessage {
    fn parser(data: (&[u8], usize)) -> IResult<(&[u8], usize), RadioStatus> {
        let (data, sync_state) =
            map_res(take_bits::<_, u8, _, (_, _)>(2u8), SyncState::parse)(data)?;
        let (data, slot_timeout) = take_bits::<_, u8, _, (_, _)>(3u8)(data)?;
        let (data, sub_message) = SubMessage::parse(data, slot_timeout)?;
        Ok((
            data,
            RadioStatus::Sotdma(Self {
                sync_state,
                slot_timeout,
                sub_message,
            }),
        ))
    }
}

#[derive(Debug, PartialEq)]
pub struct ItdmaMessage {
    pub sync_state: SyncState,
    pub slot_increment: i16,
    pub num_slots: u8,
    pub keep: bool,
}

impl ItdmaMessage {
    fn parser(data: (&[u8], usize)) -> IResult<(&[u8], usize), RadioStatus> {
        let (data, sync_state) =
            map_res(take_bits::<_, u8, _, (_, _)>(2u8), SyncState::parse)(data)?;
        let (data, slot_increment) = take_bits::<_, i16, _, (_, _)>(13u8)(data)?;
        let (data, num_slots) = take_bits::<_, u8, _, (_, _)>(3u8)(data)?;
        let (data, keep) = take_bits::<_, u8, _, (_, _)>(1u8)(data)?;
        Ok((
            data,
            RadioStatus::Itdma(Self {
                sync_state,
                slot_increment,
                num_slots,
                keep: keep != 0,
            }),
        ))
    }
}

/// Dispatches to the SOTDMA or ITDMA radio status sub-parser based on the
/// enclosing message's type, per ITU-R M.1371.
pub fn parse_radio(
    data: (&[u8], usize),
    msg_type: u8,
) -> IResult<(&[u8], usize), RadioStatus> {
    match msg_type {
        1 | 2 | 4 => SotdmaMessage::parser(data),
        3 => ItdmaMessage::parser(data),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            data,
            nom::error::ErrorKind::Digit,
        ))),
    }
}
