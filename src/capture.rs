//! Capture-file framing: reads a pcap/pcapng file into a sequence of
//! `Frame`s.
//!
//! The frame iterator is treated as an external collaborator by the rest of
//! this crate: `dissect()` only ever sees a `LinkType` and a byte slice.
//! This module is the one concrete implementation, built on `pcap-parser`
//! (classic pcap and pcapng), matching the pattern used by comparable
//! pcap-to-X tools in the ecosystem. Dissection itself is hand-rolled in
//! `layers`/`packet`, not delegated to a third-party parser.

use std::fs::File;
use std::path::Path;

use pcap_parser::pcapng::Block;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{create_reader, Linktype, PcapBlockOwned, PcapError};

use crate::error::{Error, Result};
use crate::layers::LinkType;

/// One captured frame, owned so it can outlive the reader's internal buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub link_type: LinkType,
    pub caplen: u32,
    pub len: u32,
    pub data: Vec<u8>,
}

fn map_linktype(lt: Linktype) -> Option<LinkType> {
    match lt {
        Linktype::NULL => Some(LinkType::Null),
        Linktype::ETHERNET => Some(LinkType::Ethernet),
        _ => None,
    }
}

/// Reads every frame out of a pcap/pcapng file, in capture order.
///
/// An unsupported link type is a silent drop (same policy as an unsupported
/// next-protocol during dissection); a `caplen != len` frame is fatal
/// instead, surfaced as `Error::TruncatedFrame`.
pub fn read_frames(path: &Path) -> Result<Vec<Frame>> {
    let file = File::open(path)?;
    let mut reader = create_reader(65536, file)
        .map_err(|e| Error::MalformedPacket(format!("failed to open capture: {e}")))?;

    let mut frames = Vec::new();
    let mut legacy_linktype = None;
    let mut idb_linktypes: Vec<Linktype> = Vec::new();

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(hdr) => {
                        legacy_linktype = Some(hdr.network);
                    }
                    PcapBlockOwned::Legacy(b) => {
                        let linktype = legacy_linktype.unwrap_or(Linktype::ETHERNET);
                        push_frame(&mut frames, linktype, b.caplen, b.origlen, b.data)?;
                    }
                    PcapBlockOwned::NG(ng) => match ng {
                        Block::SectionHeader(_) => {
                            idb_linktypes.clear();
                        }
                        Block::InterfaceDescription(idb) => {
                            idb_linktypes.push(idb.linktype);
                        }
                        Block::EnhancedPacket(epb) => {
                            if let Some(&linktype) = idb_linktypes.get(epb.if_id as usize) {
                                push_frame(
                                    &mut frames,
                                    linktype,
                                    epb.caplen,
                                    epb.origlen,
                                    epb.packet_data(),
                                )?;
                            }
                        }
                        Block::SimplePacket(spb) => {
                            if let Some(&linktype) = idb_linktypes.first() {
                                let data = spb.packet_data();
                                let len = data.len() as u32;
                                push_frame(&mut frames, linktype, len, spb.origlen, data)?;
                            }
                        }
                        _ => {}
                    },
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete) => {
                reader
                    .refill()
                    .map_err(|e| Error::MalformedPacket(format!("failed to refill reader: {e}")))?;
            }
            Err(e) => return Err(Error::MalformedPacket(format!("pcap parse error: {e}"))),
        }
    }

    Ok(frames)
}

fn push_frame(
    frames: &mut Vec<Frame>,
    linktype: Linktype,
    caplen: u32,
    origlen: u32,
    data: &[u8],
) -> Result<()> {
    if caplen != origlen {
        return Err(Error::TruncatedFrame {
            caplen,
            len: origlen,
        });
    }
    let Some(link_type) = map_linktype(linktype) else {
        tracing::debug!("dropping frame: unsupported link type {linktype:?}");
        return Ok(());
    };
    frames.push(Frame {
        link_type,
        caplen,
        len: origlen,
        data: data.to_vec(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pcap_global_header(linktype: u32) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
        h.extend_from_slice(&2u16.to_le_bytes());
        h.extend_from_slice(&4u16.to_le_bytes());
        h.extend_from_slice(&0i32.to_le_bytes());
        h.extend_from_slice(&0u32.to_le_bytes());
        h.extend_from_slice(&65535u32.to_le_bytes());
        h.extend_from_slice(&linktype.to_le_bytes());
        h
    }

    fn pcap_record(payload: &[u8], caplen: u32, origlen: u32) -> Vec<u8> {
        let mut r = Vec::new();
        r.extend_from_slice(&0u32.to_le_bytes());
        r.extend_from_slice(&0u32.to_le_bytes());
        r.extend_from_slice(&caplen.to_le_bytes());
        r.extend_from_slice(&origlen.to_le_bytes());
        r.extend_from_slice(payload);
        r
    }

    #[test]
    fn test_read_frames_legacy_pcap_ethernet() {
        let dir = std::env::temp_dir();
        let path = dir.join("packet_replay_test_capture.pcap");
        let mut file = File::create(&path).unwrap();
        file.write_all(&pcap_global_header(1)).unwrap(); // DLT_EN10MB
        let payload = vec![0xaa; 20];
        file.write_all(&pcap_record(&payload, 20, 20)).unwrap();
        drop(file);

        let frames = read_frames(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].link_type, LinkType::Ethernet);
        assert_eq!(frames[0].data, vec![0xaa; 20]);
    }

    #[test]
    fn test_read_frames_rejects_truncated_frame() {
        let dir = std::env::temp_dir();
        let path = dir.join("packet_replay_test_truncated.pcap");
        let mut file = File::create(&path).unwrap();
        file.write_all(&pcap_global_header(1)).unwrap();
        let payload = vec![0xbb; 10];
        file.write_all(&pcap_record(&payload, 10, 40)).unwrap();
        drop(file);

        let err = read_frames(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, Error::TruncatedFrame { caplen: 10, len: 40 }));
    }
}
