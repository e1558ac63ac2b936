/// Cosine of the angle between `a` and `b`, in [-1, 1].
///
/// Returns exactly 0.0 when either vector is all zeros: blank profile fields
/// embed to zeros and must not match anything, including each other.
/// Accumulates in f64 so a vector scored against itself comes out at 1.0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    // Vectors are produced internally with a fixed dimension.
    debug_assert_eq!(a.len(), b.len(), "embedding dimensions must match");

    if is_zero(a) || is_zero(b) {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}
