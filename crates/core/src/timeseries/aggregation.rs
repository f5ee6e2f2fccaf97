use super::timeseries_model::{DailyRecord, PredictionLabel, PredictionPeriod};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub insomnia: usize,
    pub normal: usize,
    pub sleep_apnea: usize,
}

impl LabelCounts {
    /// Rows without a label, or with an unknown code, are not counted.
    pub fn from_records(records: &[DailyRecord]) -> Self {
        let mut counts = LabelCounts::default();
        for label in records
            .iter()
            .filter_map(|r| r.prediction_result)
            .filter_map(PredictionLabel::from_code)
        {
            match label {
                PredictionLabel::Insomnia => counts.insomnia += 1,
                PredictionLabel::Normal => counts.normal += 1,
                PredictionLabel::SleepApnea => counts.sleep_apnea += 1,
            }
        }
        counts
    }
}

/// Majority rule over a window of daily labels.
///
/// Normal wins only with a strict majority over both disorders combined. The
/// weekly rule breaks an insomnia/apnea tie towards apnea; the monthly rule
/// falls through to insomnia.
pub fn aggregate_labels(period: PredictionPeriod, counts: LabelCounts) -> PredictionLabel {
    if counts.normal > counts.insomnia + counts.sleep_apnea {
        return PredictionLabel::Normal;
    }
    if counts.sleep_apnea > counts.insomnia {
        return PredictionLabel::SleepApnea;
    }
    match period {
        PredictionPeriod::Weekly if counts.insomnia > counts.sleep_apnea => {
            PredictionLabel::Insomnia
        }
        PredictionPeriod::Weekly => PredictionLabel::SleepApnea,
        PredictionPeriod::Monthly => PredictionLabel::Insomnia,
    }
}
