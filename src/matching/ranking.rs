use std::cmp::Ordering;

use serde::Serialize;

use super::score::complementary_score;
use crate::config;
use crate::profiles::Profile;

/// One ranked candidate. Carries text only; vectors never leave the matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub student_id: String,
    pub name: String,
    pub score: f64,
    pub strengths: String,
    pub weaknesses: String,
}

/// Rank every profile in `pool` other than `target_id` by complementary score
/// and return the best `top_k`.
///
/// Order is rounded score descending, then student id ascending, so results do
/// not depend on how the store happened to iterate and candidates showing the
/// same score are always listed by id. An unknown
/// `target_id` yields an empty list; reporting "not found" is the caller's job.
pub fn find_best_matches(target_id: &str, pool: &[Profile], top_k: usize) -> Vec<MatchResult> {
    let Some(target) = pool.iter().find(|p| p.id == target_id) else {
        return vec![];
    };

    let mut scored: Vec<(&Profile, f64)> = pool
        .iter()
        .filter(|p| p.id != target_id)
        .map(|p| (p, round_score(complementary_score(target, p))))
        .collect();

    scored.sort_by(|(pa, sa), (pb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| pa.id.cmp(&pb.id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(p, score)| MatchResult {
            student_id: p.id.clone(),
            name: p.name.clone(),
            score,
            strengths: p.strengths.clone(),
            weaknesses: p.weaknesses.clone(),
        })
        .collect()
}

fn round_score(score: f64) -> f64 {
    let factor = 10f64.powi(config::matching::SCORE_DECIMALS);
    (score * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::hashing_provider;
    use crate::profiles::fixture;

    fn embedded(id: &str, strengths: &str, weaknesses: &str) -> Profile {
        let provider = hashing_provider(128);
        let mut p = fixture(
            id,
            provider.embed(strengths).unwrap(),
            provider.embed(weaknesses).unwrap(),
        );
        p.strengths = strengths.to_string();
        p.weaknesses = weaknesses.to_string();
        p
    }

    fn sample_pool() -> Vec<Profile> {
        vec![
            embedded("stu001", "Mathematics Calculus Algebra Physics", "Literature Essay Writing History"),
            embedded("stu002", "Literature Essay Writing History", "Mathematics Calculus Physics"),
            embedded("stu003", "Biology Chemistry", "Programming Algorithms"),
            embedded("stu004", "Programming Algorithms", "Biology Chemistry"),
            embedded("stu005", "Statistics Economics", "Literature Creative Writing"),
        ]
    }

    #[test]
    fn test_complementary_pair_ranks_first() {
        let pool = vec![
            embedded("S1", "Mathematics", "Literature"),
            embedded("S2", "Literature", "Mathematics"),
        ];
        let matches = find_best_matches("S1", &pool, 1);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].student_id, "S2");
        assert!(matches[0].score > 0.5);
        assert_eq!(matches[0].strengths, "Literature");
        assert_eq!(matches[0].weaknesses, "Mathematics");
    }

    #[test]
    fn test_identical_profiles_score_one() {
        let pool = vec![
            embedded("A", "Physics", "Physics"),
            embedded("B", "Physics", "Physics"),
        ];
        let matches = find_best_matches("A", &pool, 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn test_unknown_target_is_empty() {
        assert!(find_best_matches("nobody", &sample_pool(), 3).is_empty());
        assert!(find_best_matches("nobody", &[], 3).is_empty());
    }

    #[test]
    fn test_target_never_in_results() {
        let pool = sample_pool();
        for p in &pool {
            let matches = find_best_matches(&p.id, &pool, pool.len());
            assert!(matches.iter().all(|m| m.student_id != p.id));
        }
    }

    #[test]
    fn test_result_length_is_min_of_k_and_candidates() {
        let pool = sample_pool();
        for k in 0..8 {
            let matches = find_best_matches("stu001", &pool, k);
            assert_eq!(matches.len(), k.min(pool.len() - 1));
        }
    }

    #[test]
    fn test_scores_non_increasing() {
        let pool = sample_pool();
        for p in &pool {
            let matches = find_best_matches(&p.id, &pool, pool.len());
            for w in matches.windows(2) {
                assert!(w[0].score >= w[1].score);
            }
        }
    }

    #[test]
    fn test_best_complement_found_in_larger_pool() {
        let pool = sample_pool();
        assert_eq!(find_best_matches("stu001", &pool, 1)[0].student_id, "stu002");
        assert_eq!(find_best_matches("stu003", &pool, 1)[0].student_id, "stu004");
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        // Every candidate is blank, so all score 0.0; order must be by id
        // regardless of pool order.
        let blank = || (vec![0.0f32; 4], vec![0.0f32; 4]);
        let mut pool = vec![fixture("target", vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0])];
        for id in ["delta", "alpha", "charlie", "bravo"] {
            let (s, w) = blank();
            pool.push(fixture(id, s, w));
        }
        let ids: Vec<String> = find_best_matches("target", &pool, 10)
            .into_iter()
            .map(|m| m.student_id)
            .collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie", "delta"]);
    }

    #[test]
    fn test_ties_after_rounding_break_by_ascending_id() {
        // "zed" is an exact complement; "amy" is off by a hair that rounding hides.
        let pool = vec![
            fixture("target", vec![1.0, 0.0], vec![1.0, 0.0]),
            fixture("zed", vec![1.0, 0.0], vec![1.0, 0.0]),
            fixture("amy", vec![1.0, 0.001], vec![1.0, 0.0]),
        ];
        let raw_zed = complementary_score(&pool[0], &pool[1]);
        let raw_amy = complementary_score(&pool[0], &pool[2]);
        assert!(raw_amy < raw_zed);

        let matches = find_best_matches("target", &pool, 2);
        assert_eq!(matches[0].score, matches[1].score);
        let ids: Vec<&str> = matches.iter().map(|m| m.student_id.as_str()).collect();
        assert_eq!(ids, vec!["amy", "zed"]);
    }

    #[test]
    fn test_scores_rounded_to_four_decimals() {
        let pool = vec![
            fixture("A", vec![1.0, 0.0], vec![0.0, 1.0]),
            fixture("B", vec![1.0, 2.0], vec![3.0, 1.0]),
        ];
        let score = find_best_matches("A", &pool, 1)[0].score;
        assert_eq!(score, (score * 10_000.0).round() / 10_000.0);
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123456), 0.1235);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_match_result_serializes_camel_case() {
        let m = MatchResult {
            student_id: "stu002".into(),
            name: "Bob".into(),
            score: 0.75,
            strengths: "Writing".into(),
            weaknesses: "Physics".into(),
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["studentId"], "stu002");
        assert_eq!(v["score"], 0.75);
    }
}
