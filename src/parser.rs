use embedded_io_async::{Read, ReadExactError};

use crate::protocol::{FixedHeader, PacketType};

pub(crate) async fn read_fixed_header<R: Read>(read: &mut R) -> Result<FixedHeader, crate::Error> {
    let byte = read_u8(read).await?;

    let packet_type = PacketType::try_from(byte >> 4)?;
    let flags = byte & 0x0F;

    if !packet_type.validate_flags(flags) {
        return Err(crate::Error::InvalidFlags);
    }

    let remaining_len = read_remaining_len(read).await?;

    Ok(FixedHeader {
        packet_type,
        flags,
        remaining_len,
    })
}

async fn read_remaining_len<R: Read>(read: &mut R) -> Result<usize, crate::Error> {
    let mut bytes_read = 0;
    let mut remaining_len: usize = 0;
    let mut multiplier = 1;

    loop {
        let byte = read_u8(read).await?;
        bytes_read += 1;

        let digit = (byte & 0x7F) as usize;
        remaining_len = remaining_len
            .checked_add(digit * multiplier)
            .ok_or(crate::Error::MalformedRemainingLength)?;

        if (byte & 0x80) == 0 {
            return Ok(remaining_len);
        }

        if bytes_read >= 4 {
            return Err(crate::Error::MalformedRemainingLength);
        }

        multiplier *= 128;
    }
}

async fn read_u8<R: Read>(read: &mut R) -> Result<u8, crate::Error> {
    let mut buf = [0u8; 1];
    read.read_exact(&mut buf).await.map_err(|err| match err {
        ReadExactError::UnexpectedEof => crate::Error::RemoteClosed,
        ReadExactError::Other(_) => crate::Error::TransportError,
    })?;

    Ok(buf[0])
}
