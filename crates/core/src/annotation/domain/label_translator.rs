/// The independent vocabularies a raw analyzer label can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelSpace {
    Emotion,
    Gender,
}

const EMOTION_TABLE: &[(&str, &str)] = &[
    ("angry", "Raiva"),
    ("fear", "Medo"),
    ("happy", "Feliz"),
    ("sad", "Triste"),
    ("surprise", "Surpresa"),
    ("neutral", "Neutro"),
];

const GENDER_TABLE: &[(&str, &str)] = &[("Man", "Masculino"), ("Woman", "Feminino")];

/// Maps raw classifier labels to display strings.
///
/// Lookups are exact-match. Labels missing from a table are returned
/// unchanged, so translation never fails.
#[derive(Clone, Debug)]
pub struct LabelTranslator {
    emotion: &'static [(&'static str, &'static str)],
    gender: &'static [(&'static str, &'static str)],
}

impl LabelTranslator {
    pub fn new() -> Self {
        Self {
            emotion: EMOTION_TABLE,
            gender: GENDER_TABLE,
        }
    }

    pub fn translate(&self, space: LabelSpace, raw: &str) -> String {
        let table = match space {
            LabelSpace::Emotion => self.emotion,
            LabelSpace::Gender => self.gender,
        };
        table
            .iter()
            .find(|(from, _)| *from == raw)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or_else(|| raw.to_string())
    }
}

impl Default for LabelTranslator {
    fn default() -> Self {
        Self::new()
    }
}
