// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Returns true if `number` is prime, by naive trial division.
///
/// This is deliberately slow: it serves as a CPU-bound unit of work.
///
/// ```
/// # use parascan::is_prime;
/// let primes = (0..30).filter(|&n| is_prime(n)).collect::<Vec<_>>();
/// assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
/// ```
pub fn is_prime(number: u64) -> bool {
    if number < 2 {
        return false;
    }
    let mut d = 2;
    // Same as `d * d <= number`, without overflow.
    while d <= number / d {
        if number % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_small_numbers() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(!is_prime(9));
        assert!(!is_prime(25));
        assert!(is_prime(97));
    }

    #[test]
    fn test_prime_counts() {
        assert_eq!((0..100).filter(|&n| is_prime(n)).count(), 25);
        assert_eq!((0..10_000).filter(|&n| is_prime(n)).count(), 1229);
    }

    #[test]
    fn test_large_numbers() {
        // Largest prime below 2^32.
        assert!(is_prime(4_294_967_291));
        // 65521 * 65537
        assert!(!is_prime(4_294_049_777));
        assert!(!is_prime(u64::MAX));
    }
}
