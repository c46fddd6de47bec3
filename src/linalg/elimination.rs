use super::{BayesNet, Conditional, EliminationError, EliminationKey, LinearRelation, LinearSystem};
use crate::core::noise::NoiseModel;
use nalgebra::DMatrix;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Pivots at or below this magnitude are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Singular values of a hard frontal block below this fraction of the
/// largest one span its null space.
const RANK_TOLERANCE: f64 = 1e-9;

/// Eliminate the variables of `system` one at a time, strictly in `ordering`.
///
/// Each step gathers every remaining relation touching the frontal variable
/// and stacks them into `[A_f | A_sep | b]` with the separator keys sorted.
/// Soft relations are whitened first and triangularized with a dense
/// Householder QR: the first `dim(frontal)` rows become the conditional and
/// the rest form a new relation on the separator.
///
/// Hard relations ([`NoiseModel::is_hard`]) are never weighted. The part of
/// the frontal variable they reach is fixed exactly by them, and the soft
/// rows only determine what is left in their null space. Hard rows that do
/// not involve the frontal variable after reduction go back into the
/// remaining set as a hard relation on the separator.
///
/// # Errors
/// * [`EliminationError::UnderDetermined`] if no relation touches a variable
///   or the gathered rows are fewer than its dimension
/// * [`EliminationError::Singular`] if its diagonal block has a zero pivot
/// * [`EliminationError::NotInOrdering`] if relations still reference a
///   variable once the ordering is exhausted
/// * [`EliminationError::DimensionMismatch`] if a variable appears with
///   different column counts
pub fn eliminate_sequential<K: EliminationKey>(
    system: &LinearSystem<K>,
    ordering: &[K],
) -> Result<BayesNet<K>, EliminationError> {
    let dims = variable_dimensions(system)?;
    let mut remaining: Vec<LinearRelation<K>> = system
        .iter()
        .map(|relation| {
            if relation.noise().is_hard() {
                relation.clone()
            } else {
                relation.whitened()
            }
        })
        .collect();
    let mut conditionals = Vec::with_capacity(ordering.len());

    for frontal in ordering {
        let (touching, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|relation| relation.involves(frontal));
        remaining = rest;

        let under_determined = || EliminationError::UnderDetermined {
            key: frontal.to_string(),
        };
        if touching.is_empty() {
            return Err(under_determined());
        }
        let frontal_dim = dims.get(frontal).copied().ok_or_else(under_determined)?;

        let separator: Vec<K> = touching
            .iter()
            .flat_map(|relation| relation.keys())
            .filter(|key| *key != frontal)
            .cloned()
            .collect::<BTreeSet<K>>()
            .into_iter()
            .collect();

        let mut offsets = Vec::with_capacity(separator.len());
        let mut cols = frontal_dim;
        for key in &separator {
            offsets.push(cols);
            cols += dims[key];
        }

        let rows: usize = touching.iter().map(|relation| relation.rows()).sum();
        if rows < frontal_dim {
            return Err(under_determined());
        }

        let (hard, soft): (Vec<_>, Vec<_>) = touching
            .iter()
            .partition(|relation| relation.noise().is_hard());
        let hard_rows = stack(&hard, frontal, &separator, &offsets, cols)?;
        let soft_rows = stack(&soft, frontal, &separator, &offsets, cols)?;

        let reduced = if hard.is_empty() {
            reduce_soft(soft_rows, frontal_dim, frontal)?
        } else {
            reduce_constrained(&hard_rows, &soft_rows, frontal_dim, frontal)?
        };

        // Remainder matrices hold only the separator and rhs columns.
        let tail = cols - frontal_dim;
        let parents: Vec<(K, DMatrix<f64>)> = separator
            .iter()
            .zip(&offsets)
            .map(|(key, &offset)| {
                (
                    key.clone(),
                    reduced
                        .conditional
                        .view((0, offset), (frontal_dim, dims[key]))
                        .into_owned(),
                )
            })
            .collect();
        conditionals.push(Conditional::new(
            frontal.clone(),
            reduced
                .conditional
                .view((0, 0), (frontal_dim, frontal_dim))
                .into_owned(),
            parents,
            reduced
                .conditional
                .column(cols)
                .rows(0, frontal_dim)
                .into_owned(),
        ));

        let hard_remainder_rows = reduced.hard_remainder.nrows();
        let soft_remainder_rows = reduced.soft_remainder.nrows();
        if !separator.is_empty() {
            for (remainder, noise) in [
                (
                    &reduced.hard_remainder,
                    NoiseModel::constrained(hard_remainder_rows),
                ),
                (
                    &reduced.soft_remainder,
                    NoiseModel::unit(soft_remainder_rows),
                ),
            ] {
                if remainder.nrows() == 0 {
                    continue;
                }
                let blocks = separator
                    .iter()
                    .zip(&offsets)
                    .map(|(key, &offset)| {
                        (
                            key.clone(),
                            remainder
                                .view((0, offset - frontal_dim), (remainder.nrows(), dims[key]))
                                .into_owned(),
                        )
                    })
                    .collect();
                let rhs = remainder.column(tail).into_owned();
                remaining.push(LinearRelation::new(blocks, rhs, noise)?);
            }
        }

        trace!(
            frontal = %frontal,
            relations = touching.len(),
            hard = hard.len(),
            separator = separator.len(),
            hard_remainder_rows,
            soft_remainder_rows,
            "eliminated variable"
        );
    }

    if let Some(key) = remaining.iter().flat_map(|relation| relation.keys()).next() {
        return Err(EliminationError::NotInOrdering {
            key: key.to_string(),
        });
    }

    Ok(BayesNet::new(conditionals))
}

/// One elimination step. `conditional` is laid out `[frontal | separator | rhs]`;
/// the remainders carry only `[separator | rhs]`.
struct Reduced {
    conditional: DMatrix<f64>,
    hard_remainder: DMatrix<f64>,
    soft_remainder: DMatrix<f64>,
}

/// Stack relations into `[A_f | A_sep | b]`.
fn stack<K: EliminationKey>(
    relations: &[&LinearRelation<K>],
    frontal: &K,
    separator: &[K],
    offsets: &[usize],
    cols: usize,
) -> Result<DMatrix<f64>, EliminationError> {
    let rows = relations.iter().map(|relation| relation.rows()).sum();
    let mut augmented = DMatrix::zeros(rows, cols + 1);
    let mut row = 0;
    for relation in relations {
        let m = relation.rows();
        for (key, block) in relation.blocks() {
            let col = if key == frontal {
                0
            } else {
                let index = separator.binary_search(key).map_err(|_| {
                    EliminationError::DimensionMismatch(format!(
                        "variable {key} missing from separator"
                    ))
                })?;
                offsets[index]
            };
            augmented
                .view_mut((row, col), (m, block.ncols()))
                .copy_from(block);
        }
        augmented
            .view_mut((row, cols), (m, 1))
            .copy_from(relation.rhs());
        row += m;
    }
    Ok(augmented)
}

/// Householder QR of an augmented matrix with a non-negative diagonal.
fn triangularize(augmented: DMatrix<f64>) -> DMatrix<f64> {
    let cols = augmented.ncols() - 1;
    let mut r = augmented.qr().r();
    for i in 0..r.nrows().min(cols) {
        if r[(i, i)] < 0.0 {
            r.row_mut(i).neg_mut();
        }
    }
    r
}

fn check_pivots<K: EliminationKey>(
    r: &DMatrix<f64>,
    count: usize,
    frontal: &K,
) -> Result<(), EliminationError> {
    if (0..count).any(|i| r[(i, i)].abs() <= PIVOT_TOLERANCE) {
        return Err(EliminationError::Singular {
            key: frontal.to_string(),
        });
    }
    Ok(())
}

/// Split a triangularized matrix after its first `count` rows; the lower
/// part drops its first `count` (zero) columns.
fn split_rows(r: &DMatrix<f64>, count: usize) -> (DMatrix<f64>, DMatrix<f64>) {
    let top = r.rows(0, count).into_owned();
    let bottom = r
        .view((count, count), (r.nrows() - count, r.ncols() - count))
        .into_owned();
    (top, bottom)
}

fn reduce_soft<K: EliminationKey>(
    soft_rows: DMatrix<f64>,
    frontal_dim: usize,
    frontal: &K,
) -> Result<Reduced, EliminationError> {
    let tail = soft_rows.ncols() - frontal_dim;
    let r = triangularize(soft_rows);
    check_pivots(&r, frontal_dim, frontal)?;
    let (conditional, soft_remainder) = split_rows(&r, frontal_dim);
    Ok(Reduced {
        conditional,
        hard_remainder: DMatrix::zeros(0, tail),
        soft_remainder,
    })
}

/// Eliminate a frontal variable touched by hard rows.
///
/// With `H_f = U Σ Vᵀ`, the frontal variable splits into `y1 = V1ᵀ x_f` over
/// the range of the hard block and `y2 = V2ᵀ x_f` over its null space. The
/// hard rows give `T1 y1 + P1 x_sep = d1` exactly, the soft rows with `y1`
/// substituted give `T2 y2 + P2 x_sep = d2`, and the two are recombined into
/// an upper-triangular conditional on `x_f`.
fn reduce_constrained<K: EliminationKey>(
    hard_rows: &DMatrix<f64>,
    soft_rows: &DMatrix<f64>,
    frontal_dim: usize,
    frontal: &K,
) -> Result<Reduced, EliminationError> {
    let n = frontal_dim;
    let tail = hard_rows.ncols() - n;

    // Step 1: range and null space of the hard frontal block
    let h_f = hard_rows.columns(0, n).into_owned();
    let eigen = (h_f.transpose() * &h_f).symmetric_eigen();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let singular = |j: usize| eigen.eigenvalues[j].max(0.0).sqrt();
    let largest = order.first().map(|&j| singular(j)).unwrap_or(0.0);
    let threshold = PIVOT_TOLERANCE.max(RANK_TOLERANCE * largest);
    let rank = order.iter().take_while(|&&j| singular(j) > threshold).count();
    let v = DMatrix::from_fn(n, n, |i, j| eigen.eigenvectors[(i, order[j])]);
    let v1 = v.columns(0, rank).into_owned();
    let v2 = v.columns(rank, n - rank).into_owned();

    // Step 2: hard rows fix y1 and leave a hard relation on the separator
    let mut hard_projected = DMatrix::zeros(hard_rows.nrows(), rank + tail);
    hard_projected
        .view_mut((0, 0), (hard_rows.nrows(), rank))
        .copy_from(&(&h_f * &v1));
    hard_projected
        .view_mut((0, rank), (hard_rows.nrows(), tail))
        .copy_from(&hard_rows.columns(n, tail));
    let hard_r = triangularize(hard_projected);
    check_pivots(&hard_r, rank, frontal)?;
    let (hard_top, hard_remainder) = split_rows(&hard_r, rank);

    // Step 3: substitute y1 = T1⁻¹ [P1 | d1] into the soft rows
    let t1 = hard_top.columns(0, rank).into_owned();
    let hard_tail = hard_top.columns(rank, tail).into_owned();
    let gain = if rank == 0 {
        DMatrix::zeros(0, tail)
    } else {
        t1.solve_upper_triangular(&hard_tail)
            .ok_or_else(|| EliminationError::Singular {
                key: frontal.to_string(),
            })?
    };
    let s_f = soft_rows.columns(0, n).into_owned();
    let soft_tail = soft_rows.columns(n, tail).into_owned() - (&s_f * &v1) * &gain;

    // Step 4: soft rows fix y2 in the null space
    let free = n - rank;
    if soft_rows.nrows() < free {
        return Err(EliminationError::UnderDetermined {
            key: frontal.to_string(),
        });
    }
    let (soft_top, soft_remainder) = if soft_rows.nrows() == 0 {
        (DMatrix::zeros(0, free + tail), DMatrix::zeros(0, tail))
    } else {
        let mut soft_projected = DMatrix::zeros(soft_rows.nrows(), free + tail);
        soft_projected
            .view_mut((0, 0), (soft_rows.nrows(), free))
            .copy_from(&(&s_f * &v2));
        soft_projected
            .view_mut((0, free), (soft_rows.nrows(), tail))
            .copy_from(&soft_tail);
        let soft_r = triangularize(soft_projected);
        check_pivots(&soft_r, free, frontal)?;
        split_rows(&soft_r, free)
    };

    // Step 5: [T1 V1ᵀ | P1 | d1; T2 V2ᵀ | P2 | d2] back to triangular form
    let mut stacked = DMatrix::zeros(n, n + tail);
    stacked
        .view_mut((0, 0), (rank, n))
        .copy_from(&(&t1 * v1.transpose()));
    stacked.view_mut((0, n), (rank, tail)).copy_from(&hard_tail);
    stacked
        .view_mut((rank, 0), (free, n))
        .copy_from(&(soft_top.columns(0, free) * v2.transpose()));
    stacked
        .view_mut((rank, n), (free, tail))
        .copy_from(&soft_top.columns(free, tail));
    let conditional = triangularize(stacked);
    check_pivots(&conditional, n, frontal)?;

    Ok(Reduced {
        conditional,
        hard_remainder,
        soft_remainder,
    })
}

fn variable_dimensions<K: EliminationKey>(
    system: &LinearSystem<K>,
) -> Result<HashMap<K, usize>, EliminationError> {
    let mut dims = HashMap::new();
    for (key, block) in system.iter().flat_map(|relation| relation.blocks()) {
        let dim = *dims.entry(key.clone()).or_insert(block.ncols());
        if dim != block.ncols() {
            return Err(EliminationError::DimensionMismatch(format!(
                "variable {key} has blocks with {dim} and {} columns",
                block.ncols()
            )));
        }
    }
    Ok(dims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::RelationConfig;
    use nalgebra::DVector;

    const TOLERANCE: f64 = 1e-9;

    fn scalar(x: f64) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, x)
    }

    fn rhs(x: f64) -> DVector<f64> {
        DVector::from_element(1, x)
    }

    /// x0 = 0, x1 = 0, x0 + x2 = 0
    fn three_variable_system() -> LinearSystem<usize> {
        let mut system = LinearSystem::new();
        system.add(LinearRelation::unary(0, scalar(1.0), rhs(0.0), NoiseModel::unit(1)).unwrap());
        system.add(LinearRelation::unary(1, scalar(1.0), rhs(0.0), NoiseModel::unit(1)).unwrap());
        system.add(
            LinearRelation::binary(0, scalar(1.0), 2, scalar(1.0), rhs(0.0), NoiseModel::unit(1))
                .unwrap(),
        );
        system
    }

    #[test]
    fn test_three_variable_conditionals() {
        let bayes_net = eliminate_sequential(&three_variable_system(), &[0, 1, 2]).unwrap();
        assert_eq!(bayes_net.ordering(), vec![0, 1, 2]);

        let sqrt2 = 2.0_f64.sqrt();
        let c0 = bayes_net.get(0).unwrap();
        assert!((c0.r()[(0, 0)] - sqrt2).abs() < TOLERANCE);
        assert_eq!(c0.parents().len(), 1);
        assert_eq!(c0.parents()[0].0, 2);
        assert!((c0.parents()[0].1[(0, 0)] - 1.0 / sqrt2).abs() < TOLERANCE);
        assert!(c0.d()[0].abs() < TOLERANCE);

        let c1 = bayes_net.get(1).unwrap();
        assert!((c1.r()[(0, 0)] - 1.0).abs() < TOLERANCE);
        assert!(c1.parents().is_empty());

        let c2 = bayes_net.get(2).unwrap();
        assert!((c2.r()[(0, 0)] - 1.0 / sqrt2).abs() < TOLERANCE);
        assert!(c2.parents().is_empty());
    }

    #[test]
    fn test_back_substitution_satisfies_relations() {
        let mut system = LinearSystem::new();
        system.add(LinearRelation::unary(0, scalar(2.0), rhs(4.0), NoiseModel::unit(1)).unwrap());
        system.add(
            LinearRelation::binary(0, scalar(1.0), 1, scalar(-1.0), rhs(1.0), NoiseModel::unit(1))
                .unwrap(),
        );
        system.add(
            LinearRelation::binary(1, scalar(3.0), 2, scalar(1.0), rhs(0.0), NoiseModel::unit(1))
                .unwrap(),
        );

        let bayes_net = eliminate_sequential(&system, &[0, 1, 2]).unwrap();
        let solution = bayes_net.solve().unwrap();
        assert!((solution[&0][0] - 2.0).abs() < TOLERANCE);
        assert!((solution[&1][0] - 1.0).abs() < TOLERANCE);
        assert!((solution[&2][0] + 3.0).abs() < TOLERANCE);
        assert!(system.error(&solution).unwrap() < TOLERANCE);
    }

    #[test]
    fn test_ordering_is_preserved() {
        let bayes_net = eliminate_sequential(&three_variable_system(), &[2, 1, 0]).unwrap();
        assert_eq!(bayes_net.ordering(), vec![2, 1, 0]);
        let solution = bayes_net.solve().unwrap();
        for key in 0..3 {
            assert!(solution[&key][0].abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_unconstrained_variable_is_under_determined() {
        let result = eliminate_sequential(&three_variable_system(), &[0, 1, 2, 3]);
        assert_eq!(
            result,
            Err(EliminationError::UnderDetermined {
                key: "3".to_string()
            })
        );
    }

    #[test]
    fn test_too_few_rows_is_under_determined() {
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::unary(
                0,
                DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
                rhs(0.0),
                NoiseModel::unit(1),
            )
            .unwrap(),
        );
        assert!(matches!(
            eliminate_sequential(&system, &[0]),
            Err(EliminationError::UnderDetermined { .. })
        ));
    }

    #[test]
    fn test_singular_pivot() {
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::unary(
                0,
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]),
                DVector::zeros(2),
                NoiseModel::unit(2),
            )
            .unwrap(),
        );
        assert_eq!(
            eliminate_sequential(&system, &[0]),
            Err(EliminationError::Singular {
                key: "0".to_string()
            })
        );
    }

    #[test]
    fn test_incomplete_ordering() {
        assert_eq!(
            eliminate_sequential(&three_variable_system(), &[0, 1]),
            Err(EliminationError::NotInOrdering {
                key: "2".to_string()
            })
        );
    }

    #[test]
    fn test_inconsistent_dimensions() {
        let mut system = three_variable_system();
        system.add(
            LinearRelation::unary(2, DMatrix::identity(2, 2), DVector::zeros(2), NoiseModel::unit(2))
                .unwrap(),
        );
        assert!(matches!(
            eliminate_sequential(&system, &[0, 1, 2]),
            Err(EliminationError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_hard_relation_is_exact_against_default_soft_weight() {
        // x = 1 (hard) and x = 3 (soft, default pose sigma)
        let sigma = RelationConfig::default().pose_sigma;
        let mut system = LinearSystem::new();
        system.add(LinearRelation::unary(0, scalar(1.0), rhs(1.0), NoiseModel::constrained(1)).unwrap());
        system.add(LinearRelation::unary(0, scalar(1.0), rhs(3.0), NoiseModel::isotropic(1, sigma)).unwrap());
        let solution = eliminate_sequential(&system, &[0]).unwrap().solve().unwrap();
        assert!((solution[&0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hard_relation_carries_into_separator() {
        // x0 + x1 = 2 (hard), x0 = 5 and x1 = 0 (soft, equal sigmas)
        let sigma = RelationConfig::default().twist_sigma;
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::binary(0, scalar(1.0), 1, scalar(1.0), rhs(2.0), NoiseModel::constrained(1))
                .unwrap(),
        );
        system.add(LinearRelation::unary(0, scalar(1.0), rhs(5.0), NoiseModel::isotropic(1, sigma)).unwrap());
        system.add(LinearRelation::unary(1, scalar(1.0), rhs(0.0), NoiseModel::isotropic(1, sigma)).unwrap());

        let bayes_net = eliminate_sequential(&system, &[0, 1]).unwrap();
        let solution = bayes_net.solve().unwrap();
        assert!((solution[&0][0] + solution[&1][0] - 2.0).abs() < 1e-12);
        assert!((solution[&0][0] - 3.5).abs() < TOLERANCE);
        assert!((solution[&1][0] + 1.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_hard_remainder_stays_exact() {
        // x0 - x1 = 0 and x0 = 1 (hard); x1 = 4 (soft) must not move x1
        let sigma = RelationConfig::default().torque_sigma;
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::binary(0, scalar(1.0), 1, scalar(-1.0), rhs(0.0), NoiseModel::constrained(1))
                .unwrap(),
        );
        system.add(LinearRelation::unary(0, scalar(1.0), rhs(1.0), NoiseModel::constrained(1)).unwrap());
        system.add(LinearRelation::unary(1, scalar(1.0), rhs(4.0), NoiseModel::isotropic(1, sigma)).unwrap());

        let solution = eliminate_sequential(&system, &[0, 1]).unwrap().solve().unwrap();
        assert!((solution[&0][0] - 1.0).abs() < 1e-12);
        assert!((solution[&1][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_soft_rows_fill_hard_null_space() {
        // x = (a, b): a + b = 2 (hard), a = 0 and b = 4 (soft)
        let sigma = RelationConfig::default().wrench_sigma;
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::unary(
                0,
                DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
                rhs(2.0),
                NoiseModel::constrained(1),
            )
            .unwrap(),
        );
        system.add(
            LinearRelation::unary(
                0,
                DMatrix::identity(2, 2),
                DVector::from_vec(vec![0.0, 4.0]),
                NoiseModel::isotropic(2, sigma),
            )
            .unwrap(),
        );

        let bayes_net = eliminate_sequential(&system, &[0]).unwrap();
        let c0 = bayes_net.get(0).unwrap();
        assert!(c0.r()[(1, 0)].abs() < TOLERANCE);
        let solution = bayes_net.solve().unwrap();
        assert!((solution[&0][0] + solution[&0][1] - 2.0).abs() < 1e-12);
        assert!((solution[&0][0] + 1.0).abs() < TOLERANCE);
        assert!((solution[&0][1] - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_hard_null_space_without_soft_rows_is_under_determined() {
        let mut system = LinearSystem::new();
        system.add(
            LinearRelation::unary(
                0,
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]),
                DVector::from_vec(vec![1.0, 2.0]),
                NoiseModel::constrained(2),
            )
            .unwrap(),
        );
        assert_eq!(
            eliminate_sequential(&system, &[0]),
            Err(EliminationError::UnderDetermined {
                key: "0".to_string()
            })
        );
    }
}
