//! Smallest enclosing sphere (Welzl's algorithm).
//!
//! Iterative formulation over a random permutation of the input, with
//! an explicit stack instead of recursion. The caller supplies the RNG;
//! a seeded generator makes the whole computation deterministic. If the
//! circumsphere solve ever goes singular (collinear or coincident
//! support points), the whole query falls back to the sphere around the
//! axis-aligned bounding box.

use rand::seq::SliceRandom;
use rand::Rng;
use rigkit_math::{tol, Point3, Vec3};

/// A sphere given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Sphere center.
    pub center: Point3,
    /// Sphere radius.
    pub radius: f64,
}

impl Sphere {
    /// The degenerate sphere at the origin.
    pub fn zero() -> Self {
        Self {
            center: Point3::origin(),
            radius: 0.0,
        }
    }

    /// Whether `p` is inside or on the sphere, within the Welzl
    /// squared-distance tolerance.
    pub fn contains(&self, p: &Point3) -> bool {
        (p - self.center).norm_squared() <= self.radius * self.radius + tol::WELZL_EPS
    }

    /// Grow the radius so the sphere of radius `point_radius` around `p`
    /// fits inside. Used for BVH bounds that mix triangles and
    /// primitive children.
    pub fn grow_to_include(&mut self, p: &Point3, point_radius: f64) {
        let d = (p - self.center).norm() + point_radius;
        if d > self.radius {
            self.radius = d;
        }
    }
}

/// Sphere enclosing the axis-aligned bounding box of `points`.
pub fn aabb_sphere(points: &[Point3]) -> Sphere {
    let Some(first) = points.first() else {
        return Sphere::zero();
    };
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        for k in 0..3 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    let center = Point3::from((min.coords + max.coords) / 2.0);
    let radius = (max - min).norm() / 2.0;
    Sphere { center, radius }
}

/// Smallest sphere enclosing `points`.
///
/// `rng` drives the initial permutation; pass a fixed-seed generator for
/// repeatable output.
pub fn enclosing_sphere<R: Rng + ?Sized>(points: &[Point3], rng: &mut R) -> Sphere {
    match points.len() {
        0 => return Sphere::zero(),
        1 => {
            return Sphere {
                center: points[0],
                radius: 0.0,
            }
        }
        _ => {}
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.shuffle(rng);
    let shuffled: Vec<Point3> = order.into_iter().map(|i| points[i]).collect();

    match welzl_iterative(&shuffled) {
        Some(s) => s,
        None => aabb_sphere(points),
    }
}

/// Explicit-stack simulation of the recursive Welzl procedure
/// `b(n, support)`. Returns `None` if any boundary solve is singular.
fn welzl_iterative(points: &[Point3]) -> Option<Sphere> {
    // Stages: 0 = enter the call, 1 = first recursion returned,
    // 2 = unwind the support push.
    let mut stack: Vec<(usize, u8)> = vec![(points.len(), 0)];
    let mut support: Vec<Point3> = Vec::with_capacity(4);
    let mut current = Sphere::zero();

    while let Some((n, stage)) = stack.pop() {
        match stage {
            0 => {
                if n == 0 || support.len() == 4 {
                    current = boundary_sphere(&support)?;
                } else {
                    stack.push((n, 1));
                    stack.push((n - 1, 0));
                }
            }
            1 => {
                let p = points[n - 1];
                if !current.contains(&p) {
                    support.push(p);
                    stack.push((n, 2));
                    stack.push((n - 1, 0));
                }
            }
            2 => {
                support.pop();
            }
            _ => unreachable!(),
        }
    }
    Some(current)
}

/// Smallest sphere with every support point on its boundary.
fn boundary_sphere(support: &[Point3]) -> Option<Sphere> {
    let sphere = match support {
        [] => Sphere::zero(),
        [a] => Sphere {
            center: *a,
            radius: 0.0,
        },
        [a, b] => {
            let center = Point3::from((a.coords + b.coords) / 2.0);
            Sphere {
                center,
                radius: (b - a).norm() / 2.0,
            }
        }
        [a, b, c] => circumsphere_3(a, b, c)?,
        [a, b, c, d] => circumsphere_4(a, b, c, d)?,
        _ => unreachable!("support set never exceeds 4 points"),
    };
    // Accept only if every support point sits on the boundary within
    // the squared-distance tolerance.
    let r2 = sphere.radius * sphere.radius;
    for p in support {
        if ((p - sphere.center).norm_squared() - r2).abs() > tol::WELZL_EPS {
            return None;
        }
    }
    Some(sphere)
}

/// Circumcenter of three points, in their common plane.
fn circumsphere_3(a: &Point3, b: &Point3, c: &Point3) -> Option<Sphere> {
    let ab = b - a;
    let ac = c - a;
    let n = ab.cross(&ac);
    let denom = 2.0 * n.norm_squared();
    if denom < tol::WELZL_EPS {
        return None;
    }
    let offset = (n.cross(&ab) * ac.norm_squared() + ac.cross(&n) * ab.norm_squared()) / denom;
    let center = a + offset;
    Some(Sphere {
        center,
        radius: offset.norm(),
    })
}

/// Circumcenter of four points via the linear system
/// `2 (pᵢ − p₀) · c = ‖pᵢ‖² − ‖p₀‖²`.
fn circumsphere_4(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Option<Sphere> {
    let rows = [b - a, c - a, d - a];
    let mut m = nalgebra::Matrix3::<f64>::zeros();
    let mut rhs = Vec3::zeros();
    for (i, r) in rows.iter().enumerate() {
        m.set_row(i, &(2.0 * r).transpose());
        let pi = match i {
            0 => b,
            1 => c,
            _ => d,
        };
        rhs[i] = pi.coords.norm_squared() - a.coords.norm_squared();
    }
    let inv = m.try_inverse()?;
    let center = Point3::from(inv * rhs);
    Some(Sphere {
        center,
        radius: (center - a).norm(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_points() {
        let pts = [Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let s = enclosing_sphere(&pts, &mut rng);
        assert_relative_eq!(s.radius, 1.0, epsilon = 1e-9);
        assert_relative_eq!(s.center.coords.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unit_ball_sample() {
        // 1000 points inside the unit ball: radius stays ≤ 1 + 1e-6 and
        // every point is enclosed.
        let mut rng = StdRng::seed_from_u64(42);
        let mut pts = Vec::new();
        while pts.len() < 1000 {
            let p = Point3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if p.coords.norm() <= 1.0 {
                pts.push(p);
            }
        }
        let s = enclosing_sphere(&pts, &mut rng);
        assert!(s.radius <= 1.0 + 1e-6);
        for p in &pts {
            assert!((p - s.center).norm() <= s.radius + 1e-6);
        }
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let pts: Vec<Point3> = (0..50)
            .map(|i| {
                let f = i as f64;
                Point3::new((f * 0.37).sin(), (f * 0.91).cos(), (f * 0.13).sin() * 2.0)
            })
            .collect();
        let a = enclosing_sphere(&pts, &mut rng_a);
        let b = enclosing_sphere(&pts, &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_collinear_falls_back_to_aabb() {
        // All points on a line: 3- and 4-point solves are singular, but
        // 2-point supports suffice, so either path must still enclose.
        let pts: Vec<Point3> = (0..10)
            .map(|i| Point3::new(i as f64, 0.0, 0.0))
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let s = enclosing_sphere(&pts, &mut rng);
        for p in &pts {
            assert!((p - s.center).norm() <= s.radius + 1e-9);
        }
        assert!(s.radius <= 4.5 + 1e-6);
    }

    #[test]
    fn test_aabb_sphere() {
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0)];
        let s = aabb_sphere(&pts);
        assert_relative_eq!(s.center.x, 1.0);
        assert_relative_eq!(s.radius, 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_grow_to_include() {
        let mut s = Sphere {
            center: Point3::origin(),
            radius: 1.0,
        };
        s.grow_to_include(&Point3::new(3.0, 0.0, 0.0), 0.5);
        assert_relative_eq!(s.radius, 3.5, epsilon = 1e-12);
        s.grow_to_include(&Point3::new(0.5, 0.0, 0.0), 0.1);
        assert_relative_eq!(s.radius, 3.5, epsilon = 1e-12);
    }
}
