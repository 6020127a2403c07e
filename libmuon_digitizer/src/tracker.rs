use super::digit::Digit;
use super::electronics::ElectronicsAddress;
use super::error::{DecodeWarning, RawEventError};
use super::store::{DigitSink, InsertPolicy};
use super::stream::{TrackerSource, TrackerSample};
use super::translator::AddressTranslator;

/// Decodes the tracker sub-stream of one event into digits.
///
/// Every sample is translated independently; a sample whose address has no
/// pad, or whose digit the sink rejects, is recorded as a warning and the
/// loop moves on. Only a corrupt stream stops the decode.
#[derive(Debug, Clone)]
pub struct TrackerDecoder {
    translator: AddressTranslator,
}

impl TrackerDecoder {
    pub fn new(translator: AddressTranslator) -> Self {
        Self { translator }
    }

    /// Pull samples until the stream is exhausted. Returns the number of
    /// digits the sink accepted.
    pub fn decode<S, D>(
        &self,
        stream: &mut S,
        sink: &mut D,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<usize, RawEventError>
    where
        S: TrackerSource,
        D: DigitSink,
    {
        let mut inserted = 0;
        while let Some(sample) = stream.next_sample()? {
            if self.digitize_sample(&sample, sink, warnings) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn digitize_sample<D: DigitSink>(
        &self,
        sample: &TrackerSample,
        sink: &mut D,
        warnings: &mut Vec<DecodeWarning>,
    ) -> bool {
        let address = ElectronicsAddress::new(sample.link, sample.chip, sample.channel);
        let geometry = match self.translator.translate(&address) {
            Ok(geometry) => geometry,
            Err(failure) => {
                warnings.push(DecodeWarning::Address(failure));
                return false;
            }
        };

        let digit = Digit {
            detector_element: geometry.detector_element,
            chip: sample.chip,
            channel: sample.channel as u16,
            cathode: geometry.cathode,
            pad_x: geometry.pad_x,
            pad_y: geometry.pad_y,
            amplitude: sample.amplitude,
        };
        if sink.insert(digit, InsertPolicy::Deny) {
            true
        } else {
            warnings.push(DecodeWarning::DuplicateDigit {
                det: geometry.detector_element,
                chip: sample.chip,
                channel: sample.channel as u16,
            });
            false
        }
    }
}
