// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::iter;

use float_cmp::ApproxEq;

/// Asserts that two floats, or two nested containers of floats, are approximately equal.
///
/// ```
/// use wallrec_test_utils::assert_approx_eq;
/// assert_approx_eq!(f32, 0.1 + 0.2, 0.3);
/// assert_approx_eq!(f64, [[0.5, 1.], [2., 4.]], vec![[0.5, 1.], [2., 4.]]);
/// assert_approx_eq!(f32, Some(0.25), Some(0.25 + 1e-7), epsilon = 1e-6);
/// ```
///
/// `ulps` defaults to `2` and `epsilon` to `0`. Two NaN leaves are treated as equal, the check is
/// about reproducing an expected outcome and not about IEEE semantics.
#[macro_export]
macro_rules! assert_approx_eq {
    ($t:ty, $left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, ulps = $ulps:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = $ulps)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = $epsilon, ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr, ulps = $ulps:expr $(,)?) => {{
        let (epsilon, ulps) = ($epsilon, $ulps);
        let (left, right) = (&$left, &$right);
        let mut left = $crate::FloatLeaves::<$t>::leaves(left, Vec::new());
        let mut right = $crate::FloatLeaves::<$t>::leaves(right, Vec::new());
        loop {
            match (left.next(), right.next()) {
                (Some((left_path, l)), Some((right_path, r))) => {
                    std::assert_eq!(
                        left_path, right_path,
                        "Shape mismatch: {:?} != {:?}",
                        left_path, right_path,
                    );
                    if !(l.is_nan() && r.is_nan()) {
                        std::assert!(
                            $crate::approx_eq!($t, l, r, epsilon = epsilon, ulps = ulps),
                            "Values differ (epsilon={:?}, ulps={:?}) at index {:?}: {:?} != {:?}",
                            epsilon, ulps, left_path, l, r,
                        );
                    }
                }
                (Some((path, _)), None) => std::panic!("Left input is longer at index {:?}", path),
                (None, Some((path, _))) => std::panic!("Right input is longer at index {:?}", path),
                (None, None) => break,
            }
        }
    }};
}

/// Flattens a (possibly nested) value into its float leaves in logical order.
///
/// Only meant to back [`assert_approx_eq!`].
pub trait FloatLeaves<'a, F>
where
    Self: 'a,
    F: ApproxEq + Copy,
{
    /// Yields each leaf together with its index path below `prefix`.
    fn leaves(&'a self, prefix: Vec<usize>) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, F)>>;
}

fn nested<'a, F, T>(
    elements: impl 'a + Iterator<Item = &'a T>,
    prefix: Vec<usize>,
) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, F)>>
where
    F: 'a + ApproxEq + Copy,
    T: 'a + FloatLeaves<'a, F> + ?Sized,
{
    Box::new(elements.enumerate().flat_map(move |(index, element)| {
        let mut path = prefix.clone();
        path.push(index);
        element.leaves(path)
    }))
}

macro_rules! impl_float_leaves {
    ($($float:ty),+ $(,)?) => {$(
        impl<'a> FloatLeaves<'a, $float> for $float {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                Box::new(iter::once((prefix, *self)))
            }
        }

        impl<'a, T> FloatLeaves<'a, $float> for &'a T
        where
            T: 'a + FloatLeaves<'a, $float> + ?Sized,
        {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                (**self).leaves(prefix)
            }
        }

        impl<'a, T> FloatLeaves<'a, $float> for [T]
        where
            T: 'a + FloatLeaves<'a, $float>,
        {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                nested(self.iter(), prefix)
            }
        }

        impl<'a, T, const N: usize> FloatLeaves<'a, $float> for [T; N]
        where
            T: 'a + FloatLeaves<'a, $float>,
        {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                nested(self.iter(), prefix)
            }
        }

        impl<'a, T> FloatLeaves<'a, $float> for Vec<T>
        where
            T: 'a + FloatLeaves<'a, $float>,
        {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                nested(self.iter(), prefix)
            }
        }

        impl<'a, T> FloatLeaves<'a, $float> for Option<T>
        where
            T: 'a + FloatLeaves<'a, $float>,
        {
            fn leaves(
                &'a self,
                prefix: Vec<usize>,
            ) -> Box<dyn 'a + Iterator<Item = (Vec<usize>, $float)>> {
                nested(self.iter(), prefix)
            }
        }
    )+};
}

impl_float_leaves! { f32, f64 }

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    #[test]
    fn test_scalars() {
        assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 3);
        catch_unwind(|| assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 2)).unwrap_err();
    }

    #[test]
    fn test_containers() {
        assert_approx_eq!(f64, &[0.25, 1.25], vec![0.25, 1.25]);
        assert_approx_eq!(f32, [[0.5], [1.5]], vec![vec![0.5], vec![1.5]]);
        assert_approx_eq!(f32, Some(1.), Some(1.));
    }

    #[test]
    #[should_panic(expected = "at index [1]")]
    fn test_reports_index_of_difference() {
        assert_approx_eq!(f32, [0.35, 4.35], [0.35, 4.45]);
    }

    #[test]
    #[should_panic(expected = "Left input is longer")]
    fn test_length_mismatch() {
        assert_approx_eq!(f32, [1., 2., 3.], [1., 2.]);
    }

    #[test]
    #[should_panic(expected = "Right input is longer")]
    fn test_none_vs_some() {
        assert_approx_eq!(f32, None::<f32>, Some(1.));
    }

    #[test]
    fn test_nan_equals_nan() {
        assert_approx_eq!(f64, [3.1, f64::NAN], [3.1, f64::NAN]);
    }

    #[test]
    fn test_epsilon() {
        assert_approx_eq!(f32, 0.125, 0.625, epsilon = 0.5);
        catch_unwind(|| assert_approx_eq!(f32, 0.125, 0.625, epsilon = 0.49)).unwrap_err();
    }
}
