//! Locale scaffolding for prompts and user-facing fallback text.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Tr => write!(f, "tr"),
        }
    }
}

/// Natural-language text around the data section of a prompt.
///
/// Data values and field names are never part of the scaffolding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaffolding {
    pub role: &'static str,
    pub instructions: &'static [&'static str],
    pub data_header: &'static str,
    pub scope_label: &'static str,
    pub summary_header: &'static str,
    pub records_header: &'static str,
    pub no_records: &'static str,
    pub rankings_header: &'static str,
    pub efficiency_header: &'static str,
    pub efficiency_excluded: &'static str,
    pub schedule_header: &'static str,
    pub satisfaction_header: &'static str,
    pub categories_header: &'static str,
    pub trend_header: &'static str,
    pub undefined_delta: &'static str,
    pub services_header: &'static str,
    pub comments_header: &'static str,
    pub profiles_header: &'static str,
    pub insights_header: &'static str,
    pub recommendations_header: &'static str,
    pub history_header: &'static str,
    pub format_header: &'static str,
    /// Conciseness rule; `{words}` is replaced by the word limit.
    pub word_limit_rule: &'static str,
    pub format_rules: &'static [&'static str],
    pub question_header: &'static str,
    /// Shown to the user when the text-generation call fails.
    pub fallback_reply: &'static str,
}

const EN: Scaffolding = Scaffolding {
    role: "You are an analytics assistant for a dental practice. You help the practice team understand agent performance and patient satisfaction.",
    instructions: &[
        "Use only the practice data provided below.",
        "Give actionable advice when asked for recommendations.",
        "Be professional and supportive when discussing individual staff members.",
    ],
    data_header: "=== PRACTICE DATA ===",
    scope_label: "Data in scope",
    summary_header: "--- Overall summary ---",
    records_header: "--- Agent records ---",
    no_records: "No agent records are available.",
    rankings_header: "--- Rankings ---",
    efficiency_header: "--- Efficiency ranking (satisfaction per 100 minutes) ---",
    efficiency_excluded: "Excluded from the efficiency ranking (appointment duration is zero or negative)",
    schedule_header: "--- Time slots and procedures ---",
    satisfaction_header: "--- Patient satisfaction survey ---",
    categories_header: "--- Category ratings ---",
    trend_header: "--- Monthly trend and period-over-period change ---",
    undefined_delta: "undefined (previous period is zero)",
    services_header: "--- Service breakdown ---",
    comments_header: "--- Patient comments ---",
    profiles_header: "--- Agents mentioned in the question ---",
    insights_header: "--- Key insights ---",
    recommendations_header: "--- Recommendations ---",
    history_header: "--- Conversation so far ---",
    format_header: "=== RESPONSE FORMAT ===",
    word_limit_rule: "Answer in at most {words} words.",
    format_rules: &[
        "Support every claim with specific numbers from the practice data and name the field they come from.",
        "If the practice data does not contain the answer, reply exactly: \"The practice data does not include this information.\"",
        "Never invent agents, periods, services or figures.",
        "Reply in English.",
    ],
    question_header: "=== QUESTION ===",
    fallback_reply: "Sorry, I couldn't process that request right now. Please try again.",
};

const TR: Scaffolding = Scaffolding {
    role: "Bir diş kliniği için analiz asistanısın. Klinik ekibinin personel performansını ve hasta memnuniyetini anlamasına yardımcı olursun.",
    instructions: &[
        "Yalnızca aşağıda verilen klinik verilerini kullan.",
        "Öneri istendiğinde uygulanabilir tavsiyeler ver.",
        "Personel hakkında konuşurken profesyonel ve destekleyici ol.",
    ],
    data_header: "=== KLİNİK VERİLERİ ===",
    scope_label: "Kapsamdaki veriler",
    summary_header: "--- Genel özet ---",
    records_header: "--- Personel kayıtları ---",
    no_records: "Personel kaydı bulunmuyor.",
    rankings_header: "--- Sıralamalar ---",
    efficiency_header: "--- Verimlilik sıralaması (100 dakika başına memnuniyet) ---",
    efficiency_excluded: "Verimlilik sıralamasına alınmayanlar (randevu süresi sıfır veya negatif)",
    schedule_header: "--- Zaman dilimleri ve işlemler ---",
    satisfaction_header: "--- Hasta memnuniyeti anketi ---",
    categories_header: "--- Kategori puanları ---",
    trend_header: "--- Aylık eğilim ve dönemsel değişim ---",
    undefined_delta: "tanımsız (önceki dönem sıfır)",
    services_header: "--- Hizmet dağılımı ---",
    comments_header: "--- Hasta yorumları ---",
    profiles_header: "--- Soruda adı geçen personel ---",
    insights_header: "--- Önemli bulgular ---",
    recommendations_header: "--- Öneriler ---",
    history_header: "--- Önceki konuşma ---",
    format_header: "=== YANIT BİÇİMİ ===",
    word_limit_rule: "En fazla {words} kelimeyle yanıt ver.",
    format_rules: &[
        "Her iddiayı klinik verilerinden belirli sayılarla destekle ve hangi alandan geldiğini belirt.",
        "Yanıt klinik verilerinde yoksa aynen şunu yaz: \"Klinik verileri bu bilgiyi içermiyor.\"",
        "Personel, dönem, hizmet veya rakam uydurma.",
        "Türkçe yanıt ver.",
    ],
    question_header: "=== SORU ===",
    fallback_reply: "Üzgünüm, bu isteği şu anda işleyemedim. Lütfen tekrar deneyin.",
};

impl Scaffolding {
    pub fn for_locale(locale: Locale) -> &'static Scaffolding {
        match locale {
            Locale::En => &EN,
            Locale::Tr => &TR,
        }
    }

    pub fn word_limit(&self, words: usize) -> String {
        self.word_limit_rule.replace("{words}", &words.to_string())
    }
}

#[cfg(test)]
impl Scaffolding {
    /// Every fixed string of this scaffolding.
    pub fn phrases(&self) -> Vec<&'static str> {
        let mut phrases = vec![
            self.role,
            self.data_header,
            self.scope_label,
            self.summary_header,
            self.records_header,
            self.no_records,
            self.rankings_header,
            self.efficiency_header,
            self.efficiency_excluded,
            self.schedule_header,
            self.satisfaction_header,
            self.categories_header,
            self.trend_header,
            self.undefined_delta,
            self.services_header,
            self.comments_header,
            self.profiles_header,
            self.insights_header,
            self.recommendations_header,
            self.history_header,
            self.format_header,
            self.question_header,
            self.fallback_reply,
        ];
        phrases.extend_from_slice(self.instructions);
        phrases.extend_from_slice(self.format_rules);
        phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_limit() {
        assert_eq!(
            Scaffolding::for_locale(Locale::En).word_limit(150),
            "Answer in at most 150 words."
        );
        assert_eq!(
            Scaffolding::for_locale(Locale::Tr).word_limit(80),
            "En fazla 80 kelimeyle yanıt ver."
        );
    }

    #[test]
    fn test_locales_share_no_phrases() {
        let tr = Scaffolding::for_locale(Locale::Tr).phrases();
        for phrase in Scaffolding::for_locale(Locale::En).phrases() {
            assert!(!tr.contains(&phrase), "shared phrase: {}", phrase);
        }
    }

    #[test]
    fn test_locale_serde() {
        let locale: Locale = serde_json::from_str("\"tr\"").unwrap();
        assert_eq!(locale, Locale::Tr);
        assert_eq!(Locale::default().to_string(), "en");
    }
}
