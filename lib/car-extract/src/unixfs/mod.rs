mod proto;

use std::io;

pub use proto::unixfs::mod_Data::DataType;
pub use proto::unixfs::{Data, UnixTime};

/// Hash function code HAMT shards must be built with (murmur3-x64-64).
pub const HAMT_HASH_MURMUR3: u64 = 0x22;

impl<'a> TryFrom<&'a [u8]> for Data<'a> {
    type Error = io::Error;

    fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
        use quick_protobuf::{BytesReader, MessageRead};
        Data::from_reader(&mut BytesReader::from_bytes(data), data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Data<'_> {
    /// Encode the message without a length prefix, the way it is embedded in a DAG-PB node.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        use quick_protobuf::{MessageWrite, Writer};
        let mut buf = Vec::with_capacity(self.get_size());
        let mut writer = Writer::new(&mut buf);
        self.write_message(&mut writer)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(buf)
    }
}
