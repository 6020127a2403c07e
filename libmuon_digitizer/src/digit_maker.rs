use std::sync::Arc;

use super::error::{DecodeError, DecodeWarning};
use super::mapping::DetectorMap;
use super::raw_event::RawEvent;
use super::store::{DigitSink, TriggerSink};
use super::stream::{TrackerStream, TriggerStream};
use super::topology::TriggerCrateStore;
use super::tracker::TrackerDecoder;
use super::translator::AddressTranslator;
use super::trigger::TriggerDecoder;

/// Outcome of digitizing one event: how many digits each sub-stream
/// produced and every soft failure met along the way. Warnings never
/// change the overall success of the call.
#[derive(Debug, Clone, Default)]
pub struct DecodeReport {
    pub tracker_digits: usize,
    pub trigger_digits: usize,
    pub warnings: Vec<DecodeWarning>,
}

impl DecodeReport {
    pub fn total_digits(&self) -> usize {
        self.tracker_digits + self.trigger_digits
    }
}

/// Digitizes raw events: runs the tracker decoder into the digit store and
/// the trigger decoder into the trigger store, with optional trigger-digit
/// synthesis.
///
/// Owns no detector state of its own; the mapping and topology handles are
/// shared, immutable services, so one maker (or several) can digitize any
/// number of events, concurrently if each decode has its own stores.
#[derive(Debug, Clone)]
pub struct DigitMaker {
    tracker: TrackerDecoder,
    trigger: TriggerDecoder,
    make_trigger_digits: bool,
}

impl DigitMaker {
    pub fn new(map: Arc<DetectorMap>, crates: Arc<TriggerCrateStore>) -> Self {
        let translator = AddressTranslator::new(map);
        Self {
            tracker: TrackerDecoder::new(translator.clone()),
            trigger: TriggerDecoder::new(translator, crates),
            make_trigger_digits: false,
        }
    }

    /// Enable or disable synthesis of digits from trigger hit patterns.
    pub fn set_make_trigger_digits(&mut self, make: bool) {
        self.make_trigger_digits = make;
    }

    /// Digitize one event into the given stores.
    ///
    /// Both stores are cleared before their sub-stream is decoded. A store
    /// that is not given skips the corresponding sub-stream entirely
    /// (trigger digits alone keep the trigger stream alive). On a fatal
    /// stream error the stores keep whatever was decoded up to that point;
    /// discarding the event is the caller's call.
    pub fn digitize<D, T>(
        &self,
        event: &RawEvent,
        mut digits: Option<&mut D>,
        mut triggers: Option<&mut T>,
    ) -> Result<DecodeReport, DecodeError>
    where
        D: DigitSink,
        T: TriggerSink,
    {
        if digits.is_none() && triggers.is_none() {
            return Err(DecodeError::NoOutputStore);
        }
        if self.make_trigger_digits && digits.is_none() {
            return Err(DecodeError::SynthesisWithoutDigitStore);
        }

        let mut report = DecodeReport::default();

        if let Some(sink) = digits.as_deref_mut() {
            sink.clear();
            let mut stream = TrackerStream::new(event);
            report.tracker_digits =
                self.tracker
                    .decode(&mut stream, sink, &mut report.warnings)?;
        }

        if triggers.is_some() || self.make_trigger_digits {
            if let Some(sink) = triggers.as_deref_mut() {
                sink.clear();
            }
            let digit_sink = if self.make_trigger_digits {
                digits.as_deref_mut()
            } else {
                None
            };
            let mut stream = TriggerStream::new(event);
            report.trigger_digits = self.trigger.decode(
                &mut stream,
                triggers.as_deref_mut(),
                digit_sink,
                &mut report.warnings,
            )?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digit::digit_key;
    use crate::electronics::{Cathode, PlaneType};
    use crate::mapping::{DetectorMap, Pad};
    use crate::raw_event::{DarcHeader, LocalStruct, RawFragment, RegionalBlock};
    use crate::store::{DigitStore, TriggerStore};
    use crate::topology::TriggerBoard;

    fn services() -> (Arc<DetectorMap>, Arc<TriggerCrateStore>) {
        let mut map = DetectorMap::default();
        map.add_link(3, 103);
        map.add_pad(103, PlaneType::Bending, 12, 5, Pad { x: 4, y: 9 });
        map.add_pad(103, PlaneType::Bending, 12, 6, Pad { x: 4, y: 10 });
        map.add_circuit(10, "2R", 1014);
        for strip in 0..16 {
            map.add_strip(
                1014,
                PlaneType::Bending,
                7,
                strip,
                Pad {
                    x: strip as i32,
                    y: 0,
                },
            );
        }

        let mut crates = TriggerCrateStore::default();
        crates.add_board(20, 0, 1, TriggerBoard::new(7, "2R", 0));
        (Arc::new(map), Arc::new(crates))
    }

    fn maker(make_trigger_digits: bool) -> DigitMaker {
        let (map, crates) = services();
        let mut maker = DigitMaker::new(map, crates);
        maker.set_make_trigger_digits(make_trigger_digits);
        maker
    }

    fn full_event() -> RawEvent {
        let mut event = RawEvent::new(7);
        event
            .fragments
            // channel 9 has no pad and must not stop anything
            .push(RawFragment::tracker(3, &[(12, 5, 87), (12, 9, 3), (12, 6, 101)]));
        event.fragments.push(RawFragment::trigger(
            20,
            &DarcHeader {
                global_flag: true,
                global_response: 0x1,
            },
            &[RegionalBlock {
                locals: vec![LocalStruct {
                    id: 1,
                    decision: 1,
                    x_patterns: [0x0001, 0, 0, 0],
                    y_patterns: [0, 0, 0, 0],
                }],
            }],
        ));
        event
    }

    #[test]
    fn test_digit_count_matches_valid_samples() {
        let mut digits = DigitStore::new();
        let mut triggers = TriggerStore::new();
        let report = maker(false)
            .digitize(&full_event(), Some(&mut digits), Some(&mut triggers))
            .unwrap();

        assert_eq!(report.tracker_digits, 2);
        assert_eq!(report.trigger_digits, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(digits.len(), 2);

        let digit = digits.get(digit_key(103, 12, 5, Cathode::Bend)).unwrap();
        assert_eq!((digit.pad_x, digit.pad_y), (4, 9));
        assert_eq!(digit.amplitude, 87.0);

        assert!(triggers.global().is_some());
        assert_eq!(triggers.locals().len(), 1);
    }

    #[test]
    fn test_trigger_digit_synthesis() {
        let mut digits = DigitStore::new();
        let mut triggers = TriggerStore::new();
        let report = maker(true)
            .digitize(&full_event(), Some(&mut digits), Some(&mut triggers))
            .unwrap();

        assert_eq!(report.trigger_digits, 1);
        assert_eq!(report.total_digits(), 3);
        let strip_digit = digits.get(digit_key(1014, 7, 0, Cathode::Bend)).unwrap();
        assert_eq!(strip_digit.amplitude, 1.0);
    }

    #[test]
    fn test_digit_store_only_skips_trigger_records() {
        let mut digits = DigitStore::new();
        let report = maker(false)
            .digitize::<_, TriggerStore>(&full_event(), Some(&mut digits), None)
            .unwrap();
        assert_eq!(report.tracker_digits, 2);
        assert_eq!(report.trigger_digits, 0);
    }

    #[test]
    fn test_trigger_store_only_skips_tracker() {
        let mut triggers = TriggerStore::new();
        let report = maker(false)
            .digitize::<DigitStore, _>(&full_event(), None, Some(&mut triggers))
            .unwrap();
        assert_eq!(report.total_digits(), 0);
        assert_eq!(triggers.locals().len(), 1);
    }

    #[test]
    fn test_no_store_is_a_configuration_error() {
        let result =
            maker(false).digitize::<DigitStore, TriggerStore>(&full_event(), None, None);
        assert!(matches!(result, Err(DecodeError::NoOutputStore)));
    }

    #[test]
    fn test_synthesis_without_digit_store_is_a_configuration_error() {
        let mut triggers = TriggerStore::new();
        let result =
            maker(true).digitize::<DigitStore, _>(&full_event(), None, Some(&mut triggers));
        assert!(matches!(
            result,
            Err(DecodeError::SynthesisWithoutDigitStore)
        ));
        // the call must not have touched the store
        assert!(triggers.global().is_none());
        assert!(triggers.locals().is_empty());
    }

    #[test]
    fn test_digitize_is_idempotent() {
        let event = full_event();
        let maker = maker(true);

        let mut digits_a = DigitStore::new();
        let mut triggers_a = TriggerStore::new();
        let report_a = maker
            .digitize(&event, Some(&mut digits_a), Some(&mut triggers_a))
            .unwrap();

        let mut digits_b = DigitStore::new();
        let mut triggers_b = TriggerStore::new();
        let report_b = maker
            .digitize(&event, Some(&mut digits_b), Some(&mut triggers_b))
            .unwrap();

        assert_eq!(report_a.warnings, report_b.warnings);
        assert_eq!(digits_a.sorted(), digits_b.sorted());
        assert_eq!(triggers_a.locals(), triggers_b.locals());
        assert_eq!(triggers_a.global(), triggers_b.global());

        // decoding into a previously used store starts from scratch too
        let report_c = maker
            .digitize(&event, Some(&mut digits_a), Some(&mut triggers_a))
            .unwrap();
        assert_eq!(report_c.total_digits(), report_a.total_digits());
        assert_eq!(digits_a.sorted(), digits_b.sorted());
    }

    #[test]
    fn test_truncated_stream_is_fatal_but_keeps_partial_digits() {
        let mut event = full_event();
        // corrupt the trigger fragment after the tracker one decoded fine
        let payload = &mut event.fragments[1].payload;
        payload.truncate(payload.len() - 2);

        let mut digits = DigitStore::new();
        let mut triggers = TriggerStore::new();
        let result = maker(false).digitize(&event, Some(&mut digits), Some(&mut triggers));
        assert!(matches!(result, Err(DecodeError::Stream(_))));
        // tracker digits decoded before the corruption stay put
        assert_eq!(digits.len(), 2);
    }
}
