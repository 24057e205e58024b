use serde::{Deserialize, Serialize};

/// Letter grades in descending order. String forms are fixed ("A+".."F")
/// and stored verbatim in the scores table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "D+")]
    DPlus,
    D,
    F,
}

/// All letters, highest first. Drives threshold lookup and the fixed
/// ordering of distribution buckets.
pub const ALL_LETTERS: [LetterGrade; 9] = [
    LetterGrade::APlus,
    LetterGrade::A,
    LetterGrade::BPlus,
    LetterGrade::B,
    LetterGrade::CPlus,
    LetterGrade::C,
    LetterGrade::DPlus,
    LetterGrade::D,
    LetterGrade::F,
];

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }

    pub fn parse(s: &str) -> Option<LetterGrade> {
        ALL_LETTERS.into_iter().find(|l| l.as_str() == s)
    }
}

/// Two-decimal rounding via `f64::round` (half away from zero):
/// `round2(8.605)` is 8.61, `round2(-0.005)` is -0.01.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Descending closed-lower-bound threshold table. Out-of-range inputs
/// are not rejected; anything below 4.0 is an F.
pub fn letter_for_average(avg: f64) -> LetterGrade {
    const THRESHOLDS: [(f64, LetterGrade); 8] = [
        (9.0, LetterGrade::APlus),
        (8.5, LetterGrade::A),
        (8.0, LetterGrade::BPlus),
        (7.0, LetterGrade::B),
        (6.5, LetterGrade::CPlus),
        (5.5, LetterGrade::C),
        (5.0, LetterGrade::DPlus),
        (4.0, LetterGrade::D),
    ];
    for (bound, letter) in THRESHOLDS {
        if avg >= bound {
            return letter;
        }
    }
    LetterGrade::F
}

/// Weighted average of one student/subject pairing: midterm 40%, final
/// 60%, rounded to 2 decimals. Returns `None` when either component is
/// absent; an absent input never becomes a zero.
pub fn compute_average(midterm: Option<f64>, final_score: Option<f64>) -> Option<(f64, LetterGrade)> {
    let (m, f) = match (midterm, final_score) {
        (Some(m), Some(f)) => (m, f),
        _ => return None,
    };
    let avg = round2(m * 0.4 + f * 0.6);
    Some((avg, letter_for_average(avg)))
}

pub fn grade_point(letter: LetterGrade) -> f64 {
    match letter {
        LetterGrade::APlus => 4.0,
        LetterGrade::A => 3.7,
        LetterGrade::BPlus => 3.5,
        LetterGrade::B => 3.0,
        LetterGrade::CPlus => 2.5,
        LetterGrade::C => 2.0,
        LetterGrade::DPlus => 1.5,
        LetterGrade::D => 1.0,
        LetterGrade::F => 0.0,
    }
}

/// One graded record as seen by the GPA computation: the letter (if the
/// score has been fully graded) and the credit weight of its subject.
/// Records whose subject no longer resolves never reach this function;
/// the caller's join drops them.
#[derive(Debug, Clone, Copy)]
pub struct CreditedGrade {
    pub letter: Option<LetterGrade>,
    pub credits: i64,
}

/// Credit-weighted GPA over a student's graded records. Records without
/// a letter are excluded from numerator and denominator. An empty or
/// fully-ungraded input yields exactly 0.0, never an error.
pub fn compute_gpa(records: &[CreditedGrade]) -> f64 {
    let mut points = 0.0_f64;
    let mut credits = 0_i64;
    for r in records {
        let Some(letter) = r.letter else {
            continue;
        };
        points += grade_point(letter) * r.credits as f64;
        credits += r.credits;
    }
    if credits > 0 {
        round2(points / credits as f64)
    } else {
        0.0
    }
}

/// Counts per letter in the fixed A+..F order, with a trailing "N/A"
/// bucket for scores that have no letter yet.
pub fn grade_distribution<'a, I>(letters: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = [0_i64; 9];
    let mut ungraded = 0_i64;
    for raw in letters {
        match raw.and_then(LetterGrade::parse) {
            Some(l) => {
                let idx = ALL_LETTERS.iter().position(|x| *x == l).unwrap_or(8);
                counts[idx] += 1;
            }
            None => ungraded += 1,
        }
    }

    let mut out: Vec<(String, i64)> = ALL_LETTERS
        .iter()
        .zip(counts)
        .filter(|(_, c)| *c > 0)
        .map(|(l, c)| (l.as_str().to_string(), c))
        .collect();
    if ungraded > 0 {
        out.push(("N/A".to_string(), ungraded));
    }
    out
}
