pub const MIN_GUESS: f64 = 0.0;
pub const MAX_GUESS: f64 = 100.0;
pub const GUESS_STEP: f64 = 0.5;
pub const DEFAULT_GUESS: f64 = 50.0;

pub const TOO_LOW: &str = "No, the number is higher!";
pub const TOO_HIGH: &str = "No, the number is smaller!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TooLow,
    TooHigh,
    Correct,
}

#[derive(Debug, Clone, Copy)]
pub struct Quiz {
    pub question: &'static str,
    pub answer: f64,
    pub correct_message: &'static str,
}

pub const LIFETIME_DIAGNOSIS: Quiz = Quiz {
    question: "What percentage of women on average can expect to be diagnosed with breast \
               cancer at some point in their lifetime?",
    answer: 12.5,
    correct_message: "That's right! About 12.5% of women or 1 out of 8 women will be diagnosed \
                      with breast cancer at some point in their lifetime.",
};

pub const LIFETIME_DEATH: Quiz = Quiz {
    question: "What percentage of women on average can expect to die from breast cancer at \
               some point in their lifetime?",
    answer: 3.0,
    correct_message: "Correct. About 3.125% of women or 1 out of 32 women will ultimately die \
                      of breast cancer.",
};

impl Quiz {
    /// Exact floating-point comparison, no tolerance.
    pub fn judge(&self, guess: f64) -> Verdict {
        if guess < self.answer {
            Verdict::TooLow
        } else if guess > self.answer {
            Verdict::TooHigh
        } else {
            Verdict::Correct
        }
    }

    pub fn feedback(&self, guess: f64) -> &'static str {
        match self.judge(guess) {
            Verdict::TooLow => TOO_LOW,
            Verdict::TooHigh => TOO_HIGH,
            Verdict::Correct => self.correct_message,
        }
    }
}

pub fn clamp_guess(guess: f64) -> f64 {
    guess.clamp(MIN_GUESS, MAX_GUESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_quiz() {
        assert_eq!(LIFETIME_DIAGNOSIS.judge(12.4), Verdict::TooLow);
        assert_eq!(LIFETIME_DIAGNOSIS.feedback(12.4), TOO_LOW);
        assert_eq!(LIFETIME_DIAGNOSIS.judge(12.5), Verdict::Correct);
        assert!(LIFETIME_DIAGNOSIS.feedback(12.5).contains("12.5"));
        assert_eq!(LIFETIME_DIAGNOSIS.judge(12.6), Verdict::TooHigh);
        assert_eq!(LIFETIME_DIAGNOSIS.feedback(12.6), TOO_HIGH);
    }

    #[test]
    fn death_quiz() {
        assert_eq!(LIFETIME_DEATH.feedback(2.9), TOO_LOW);
        assert_eq!(LIFETIME_DEATH.judge(3.0), Verdict::Correct);
        assert!(LIFETIME_DEATH.feedback(3.0).starts_with("Correct."));
        assert_eq!(LIFETIME_DEATH.feedback(3.1), TOO_HIGH);
    }

    #[test]
    fn default_guess_is_too_high_for_both() {
        assert_eq!(LIFETIME_DIAGNOSIS.judge(DEFAULT_GUESS), Verdict::TooHigh);
        assert_eq!(LIFETIME_DEATH.judge(DEFAULT_GUESS), Verdict::TooHigh);
    }

    #[test]
    fn guesses_are_bounded() {
        assert_eq!(clamp_guess(-4.0), 0.0);
        assert_eq!(clamp_guess(140.0), 100.0);
        assert_eq!(clamp_guess(12.5), 12.5);
    }
}
