use super::similarity::cosine;
use crate::profiles::Profile;

/// How well `a` and `b` complement each other, in [0, 1].
///
/// Average of "a's strengths vs b's weaknesses" and "b's strengths vs a's
/// weaknesses". Negative cosines floor at 0: the score measures how much the
/// pair can help each other, never how incompatible they are. Symmetric in
/// its arguments.
pub fn complementary_score(a: &Profile, b: &Profile) -> f64 {
    let a_helps_b = cosine(&a.strengths_vector, &b.weaknesses_vector);
    let b_helps_a = cosine(&b.strengths_vector, &a.weaknesses_vector);

    ((a_helps_b + b_helps_a) / 2.0).clamp(0.0, 1.0)
}
