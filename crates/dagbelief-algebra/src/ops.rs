//! The closed algebra over [`Prob`]: `mul` (independent AND), `comp`
//! (complement), and the literal numeric `add`/`sub` used only inside PIE's
//! alternating-sum expansion (see `dagbelief-engine::pie`) — those two are
//! plain componentwise arithmetic, not independent-OR, and may transiently
//! leave `[0, 1]` between PIE's alternating terms. Every op promotes its
//! operands to a common tag first (see [`Prob::promote`]), so the result
//! always carries the wider of the two input tags.

use crate::pbox;
use crate::value::Prob;

/// `P(a and b)` assuming independence: `a * b` for scalars, the
/// Moore-product for intervals, and the comonotonic grid product for
/// p-boxes.
pub fn mul(a: &Prob, b: &Prob) -> Prob {
    let (a, b) = Prob::promote(a, b);
    match (a, b) {
        (Prob::Scalar(x), Prob::Scalar(y)) => Prob::Scalar(x * y),
        (Prob::Interval { lo: lo_a, hi: hi_a }, Prob::Interval { lo: lo_b, hi: hi_b }) => {
            Prob::Interval {
                lo: lo_a * lo_b,
                hi: hi_a * hi_b,
            }
        }
        (Prob::Pbox(x), Prob::Pbox(y)) => Prob::Pbox(pbox::mul(&x, &y)),
        _ => unreachable!("promote() always returns matching tags"),
    }
}

/// `1 - a`, the complement. Unary, so no promotion is needed.
pub fn comp(a: &Prob) -> Prob {
    match a {
        Prob::Scalar(x) => Prob::Scalar(1.0 - x),
        Prob::Interval { lo, hi } => Prob::Interval {
            lo: 1.0 - hi,
            hi: 1.0 - lo,
        },
        Prob::Pbox(p) => Prob::Pbox(pbox::comp(p)),
    }
}

/// Plain numeric sum, componentwise. Not independent-OR — PIE's alternating
/// sum of intersection probabilities is what calls this.
pub fn add(a: &Prob, b: &Prob) -> Prob {
    let (a, b) = Prob::promote(a, b);
    match (a, b) {
        (Prob::Scalar(x), Prob::Scalar(y)) => Prob::Scalar(x + y),
        (Prob::Interval { lo: lo_a, hi: hi_a }, Prob::Interval { lo: lo_b, hi: hi_b }) => {
            Prob::Interval {
                lo: lo_a + lo_b,
                hi: hi_a + hi_b,
            }
        }
        (Prob::Pbox(x), Prob::Pbox(y)) => Prob::Pbox(pbox::add(&x, &y)),
        _ => unreachable!("promote() always returns matching tags"),
    }
}

/// Plain numeric difference `a - b`, componentwise.
pub fn sub(a: &Prob, b: &Prob) -> Prob {
    let (a, b) = Prob::promote(a, b);
    match (a, b) {
        (Prob::Scalar(x), Prob::Scalar(y)) => Prob::Scalar(x - y),
        (Prob::Interval { lo: lo_a, hi: hi_a }, Prob::Interval { lo: lo_b, hi: hi_b }) => {
            Prob::Interval {
                lo: lo_a - lo_b,
                hi: hi_a - hi_b,
            }
        }
        (Prob::Pbox(x), Prob::Pbox(y)) => Prob::Pbox(pbox::sub(&x, &y)),
        _ => unreachable!("promote() always returns matching tags"),
    }
}

/// `P(at least one of xs)` under independence, via the product-of-complements
/// form: `1 - prod(1 - x_i)`. This is the form case M and PIE's per-subset
/// intersection propagation both reduce to; it's commutative in its
/// arguments, which is what gives the engine's parallel layer computation
/// its deterministic output.
pub fn or_independent<'a>(xs: impl IntoIterator<Item = &'a Prob>) -> Prob {
    let mut acc = Prob::Scalar(1.0);
    for x in xs {
        acc = mul(&acc, &comp(x));
    }
    comp(&acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Prob;

    #[test]
    fn mul_scalar() {
        let a = Prob::Scalar(0.5);
        let b = Prob::Scalar(0.4);
        assert_eq!(mul(&a, &b), Prob::Scalar(0.2));
    }

    #[test]
    fn comp_scalar_is_involutive() {
        let a = Prob::Scalar(0.3);
        assert_eq!(comp(&comp(&a)), a);
    }

    #[test]
    fn add_scalar_is_plain_sum() {
        let a = Prob::Scalar(0.5);
        let b = Prob::Scalar(0.3);
        assert_eq!(add(&a, &b), Prob::Scalar(0.8));
    }

    #[test]
    fn sub_scalar_is_plain_difference() {
        let a = Prob::Scalar(0.8);
        let b = Prob::Scalar(0.5);
        assert_eq!(sub(&a, &b), Prob::Scalar(0.3));
    }

    #[test]
    fn add_can_transiently_exceed_one() {
        let a = Prob::Scalar(0.7);
        let b = Prob::Scalar(0.7);
        let Prob::Scalar(x) = add(&a, &b) else {
            panic!("expected scalar")
        };
        assert!((x - 1.4).abs() < 1e-9);
    }

    #[test]
    fn mul_promotes_scalar_to_interval() {
        let a = Prob::Scalar(0.5);
        let b = Prob::Interval { lo: 0.2, hi: 0.4 };
        assert_eq!(mul(&a, &b), Prob::Interval { lo: 0.1, hi: 0.2 });
    }

    #[test]
    fn or_independent_of_three_scalars_matches_inclusion_exclusion() {
        let ps = [Prob::Scalar(0.1), Prob::Scalar(0.2), Prob::Scalar(0.3)];
        let result = or_independent(ps.iter());
        let Prob::Scalar(x) = result else {
            panic!("expected scalar")
        };
        let expected = 1.0 - 0.9 * 0.8 * 0.7;
        assert!((x - expected).abs() < 1e-9);
    }

    #[test]
    fn or_independent_of_empty_is_zero() {
        let ps: Vec<Prob> = vec![];
        assert_eq!(or_independent(ps.iter()), Prob::Scalar(0.0));
    }

    #[test]
    fn or_independent_of_one_is_identity() {
        let ps = [Prob::Scalar(0.42)];
        assert_eq!(or_independent(ps.iter()), Prob::Scalar(0.42));
    }
}
