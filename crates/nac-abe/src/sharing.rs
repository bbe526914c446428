//! Shamir secret sharing over the scalar field

use nac_core::{NacError, Result};
use rabe_bn::Fr;
use rand::{CryptoRng, Rng};

/// Field element for a small positive integer (a child index)
pub(crate) fn scalar(value: usize) -> Result<Fr> {
    Fr::from_str(&value.to_string())
        .ok_or_else(|| NacError::crypto(format!("cannot map {value} into the scalar field")))
}

/// Random polynomial `q` of the given degree with `q(0) = secret`
pub(crate) struct Polynomial {
    coefficients: Vec<Fr>,
}

impl Polynomial {
    pub(crate) fn random<R: Rng + CryptoRng>(secret: Fr, degree: usize, rng: &mut R) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret);
        for _ in 0..degree {
            coefficients.push(rng.gen());
        }
        Self { coefficients }
    }

    /// Horner evaluation at `x`
    pub(crate) fn evaluate(&self, x: Fr) -> Fr {
        self.coefficients
            .iter()
            .rev()
            .fold(Fr::zero(), |acc, coefficient| acc * x + *coefficient)
    }
}

/// Lagrange coefficient of `index` for interpolation at zero over `indices`
pub(crate) fn lagrange_at_zero(index: usize, indices: &[usize]) -> Result<Fr> {
    let i = scalar(index)?;
    let mut coefficient = Fr::one();
    for &other in indices {
        if other == index {
            continue;
        }
        let j = scalar(other)?;
        let denominator = (j - i)
            .inverse()
            .ok_or_else(|| NacError::crypto("repeated share index during interpolation"))?;
        coefficient = coefficient * j * denominator;
    }
    Ok(coefficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_any_threshold_subset_recovers_secret() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let secret: Fr = rng.gen();
        let poly = Polynomial::random(secret, 2, &mut rng);
        let shares: Vec<(usize, Fr)> = (1..=5)
            .map(|i| (i, poly.evaluate(scalar(i).unwrap())))
            .collect();

        for subset in [[1, 2, 3], [2, 4, 5], [1, 3, 5]] {
            let mut recovered = Fr::zero();
            for &index in &subset {
                let share = shares[index - 1].1;
                recovered = recovered + share * lagrange_at_zero(index, &subset).unwrap();
            }
            assert_eq!(recovered, secret);
        }
    }

    #[test]
    fn test_constant_polynomial_gives_every_child_the_secret() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let secret: Fr = rng.gen();
        let poly = Polynomial::random(secret, 0, &mut rng);
        assert_eq!(poly.evaluate(scalar(4).unwrap()), secret);
        assert_eq!(lagrange_at_zero(4, &[4]).unwrap(), Fr::one());
    }

    #[test]
    fn test_too_few_shares_do_not_recover() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let secret: Fr = rng.gen();
        let poly = Polynomial::random(secret, 2, &mut rng);
        let subset = [1, 2];
        let mut recovered = Fr::zero();
        for &index in &subset {
            let coefficient = lagrange_at_zero(index, &subset).unwrap();
            recovered = recovered + poly.evaluate(scalar(index).unwrap()) * coefficient;
        }
        assert_ne!(recovered, secret);
    }
}
