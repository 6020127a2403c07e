use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::error::RawEventError;
use super::raw_event::{FragmentKind, RawEvent, TriggerBlock};

/// One tracker charge sample as pulled off the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSample {
    pub link: u32,
    pub chip: u16,
    pub channel: u8,
    pub amplitude: f32,
}

/// Cursor over the tracker sub-stream of one event.
///
/// `Ok(None)` signals exhaustion; an `Err` means the stream itself is
/// corrupt and the decode of this event cannot continue.
pub trait TrackerSource {
    fn next_sample(&mut self) -> Result<Option<TrackerSample>, RawEventError>;
}

/// Cursor over the trigger sub-stream of one event, one parsed DDL block
/// at a time.
pub trait TriggerSource {
    fn next_block(&mut self) -> Result<Option<TriggerBlock>, RawEventError>;
}

/// Tracker cursor over the fragments of a [`RawEvent`].
///
/// Advances to the next tracker fragment transparently when the current
/// link runs out of samples, so callers see one flat sample sequence.
pub struct TrackerStream<'a> {
    event: &'a RawEvent,
    next_fragment: usize,
    active: Option<ActiveFragment<'a>>,
}

struct ActiveFragment<'a> {
    link: u32,
    cursor: Cursor<&'a [u8]>,
    remaining: u32,
}

impl<'a> TrackerStream<'a> {
    pub fn new(event: &'a RawEvent) -> Self {
        Self {
            event,
            next_fragment: 0,
            active: None,
        }
    }

    /// Open the next tracker fragment, if any link is left.
    fn move_to_next_link(&mut self) -> Result<bool, RawEventError> {
        while self.next_fragment < self.event.fragments.len() {
            let fragment = &self.event.fragments[self.next_fragment];
            self.next_fragment += 1;
            if fragment.kind != FragmentKind::Tracker {
                continue;
            }
            let mut cursor = Cursor::new(fragment.payload.as_slice());
            let remaining = cursor.read_u32::<LittleEndian>()?;
            self.active = Some(ActiveFragment {
                link: fragment.link,
                cursor,
                remaining,
            });
            return Ok(true);
        }
        self.active = None;
        Ok(false)
    }
}

impl TrackerSource for TrackerStream<'_> {
    fn next_sample(&mut self) -> Result<Option<TrackerSample>, RawEventError> {
        loop {
            match &mut self.active {
                Some(active) if active.remaining > 0 => {
                    active.remaining -= 1;
                    let chip = active.cursor.read_u16::<LittleEndian>()?;
                    let channel = active.cursor.read_u8()?;
                    let adc = active.cursor.read_u16::<LittleEndian>()?;
                    return Ok(Some(TrackerSample {
                        link: active.link,
                        chip,
                        channel,
                        amplitude: adc as f32,
                    }));
                }
                _ => {
                    if !self.move_to_next_link()? {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Trigger cursor over the fragments of a [`RawEvent`]. Each fragment is
/// parsed in full when reached; parse failures are fatal.
pub struct TriggerStream<'a> {
    event: &'a RawEvent,
    next_fragment: usize,
}

impl<'a> TriggerStream<'a> {
    pub fn new(event: &'a RawEvent) -> Self {
        Self {
            event,
            next_fragment: 0,
        }
    }
}

impl TriggerSource for TriggerStream<'_> {
    fn next_block(&mut self) -> Result<Option<TriggerBlock>, RawEventError> {
        while self.next_fragment < self.event.fragments.len() {
            let fragment = &self.event.fragments[self.next_fragment];
            self.next_fragment += 1;
            if fragment.kind != FragmentKind::Trigger {
                continue;
            }
            return TriggerBlock::parse(fragment.link, &fragment.payload).map(Some);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::{DarcHeader, LocalStruct, RawFragment, RegionalBlock};

    #[test]
    fn test_tracker_stream_crosses_links() {
        let mut event = RawEvent::new(1);
        event.fragments.push(RawFragment::tracker(3, &[(12, 5, 87)]));
        event.fragments.push(RawFragment::trigger(
            20,
            &DarcHeader::default(),
            &[],
        ));
        event
            .fragments
            .push(RawFragment::tracker(4, &[(7, 1, 10), (7, 2, 11)]));

        let mut stream = TrackerStream::new(&event);
        let mut samples = Vec::new();
        while let Some(sample) = stream.next_sample().unwrap() {
            samples.push(sample);
        }
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].link, 3);
        assert_eq!(samples[0].amplitude, 87.0);
        assert_eq!(samples[1].link, 4);
        assert_eq!(samples[2].channel, 2);
    }

    #[test]
    fn test_tracker_stream_skips_empty_links() {
        let mut event = RawEvent::new(1);
        event.fragments.push(RawFragment::tracker(3, &[]));
        event.fragments.push(RawFragment::tracker(4, &[(1, 1, 1)]));

        let mut stream = TrackerStream::new(&event);
        let sample = stream.next_sample().unwrap().unwrap();
        assert_eq!(sample.link, 4);
        assert!(stream.next_sample().unwrap().is_none());
    }

    #[test]
    fn test_trigger_stream_yields_blocks_in_order() {
        let mut event = RawEvent::new(1);
        event.fragments.push(RawFragment::tracker(3, &[(1, 1, 1)]));
        event.fragments.push(RawFragment::trigger(
            20,
            &DarcHeader {
                global_flag: true,
                global_response: 0x3,
            },
            &[RegionalBlock {
                locals: vec![LocalStruct::default()],
            }],
        ));
        event
            .fragments
            .push(RawFragment::trigger(21, &DarcHeader::default(), &[]));

        let mut stream = TriggerStream::new(&event);
        let first = stream.next_block().unwrap().unwrap();
        assert_eq!(first.link, 20);
        assert!(first.darc.global_flag);
        assert_eq!(first.regions.len(), 1);
        let second = stream.next_block().unwrap().unwrap();
        assert_eq!(second.link, 21);
        assert!(stream.next_block().unwrap().is_none());
    }

    #[test]
    fn test_truncated_tracker_fragment_is_fatal() {
        let mut fragment = RawFragment::tracker(3, &[(12, 5, 87)]);
        fragment.payload.truncate(fragment.payload.len() - 1);
        let mut event = RawEvent::new(1);
        event.fragments.push(fragment);

        let mut stream = TrackerStream::new(&event);
        assert!(stream.next_sample().is_err());
    }
}
