//! Affirmation messages
//!
//! Picks an encouraging message for a day from the tier matching its
//! checklist completion rate.

use rand::seq::SliceRandom;
use rand::Rng;

const PERFECT: &[&str] = &[
    "Perfect! You crushed it today!",
    "Amazing! 100% completed!",
    "Incredible effort! You're unstoppable!",
    "Flawless execution! Keep it up!",
    "Champion mindset! All tasks done!",
];

const EXCELLENT: &[&str] = &[
    "Excellent work! Almost perfect!",
    "Great job! You're so close!",
    "Outstanding effort! Keep pushing!",
    "Very impressive! Nearly there!",
    "Fantastic day! Just a bit more!",
];

const GOOD: &[&str] = &[
    "Good effort! You're halfway there!",
    "Nice work! Keep improving!",
    "Solid progress! More next time!",
    "You're on the right track!",
    "Good foundation! Build on this!",
];

const STARTED: &[&str] = &[
    "It's okay! Try better next time!",
    "Small steps count! Don't give up!",
    "You got this! Push harder tomorrow!",
    "Every bit helps! Keep going!",
    "Learn from today! Better luck ahead!",
];

const NOT_STARTED: &[&str] = &[
    "Tomorrow is a new day! You got this!",
    "Don't give up! Try better next day!",
    "Reset and go again! You can do it!",
    "Every day is a fresh start!",
    "Come back stronger tomorrow!",
];

/// Message pool for a completion percentage.
pub fn tier(completion_rate: f64) -> &'static [&'static str] {
    if completion_rate >= 100.0 {
        PERFECT
    } else if completion_rate >= 75.0 {
        EXCELLENT
    } else if completion_rate >= 50.0 {
        GOOD
    } else if completion_rate > 0.0 {
        STARTED
    } else {
        NOT_STARTED
    }
}

pub fn affirmation_with<R: Rng + ?Sized>(completion_rate: f64, rng: &mut R) -> String {
    tier(completion_rate)
        .choose(rng)
        .copied()
        .unwrap_or("Keep it up!")
        .to_string()
}

pub fn affirmation(completion_rate: f64) -> String {
    affirmation_with(completion_rate, &mut rand::thread_rng())
}
