use lpsens_solver::{
    Bound, Constraint, Model, Relation, Sense, SolutionStatus, Solver, Strategy, VariableMeasure,
};

fn le_model(sense: Sense, objective: Vec<f64>, lhs: Vec<Vec<f64>>, rhs: Vec<f64>) -> Model {
    let constraints = lhs
        .into_iter()
        .zip(rhs)
        .map(|(row, b)| Constraint::new(row, Relation::Le, b))
        .collect();
    Model::new(sense, objective, constraints).unwrap()
}

#[test]
fn wyndor_example() {
    let _ = env_logger::builder().is_test(true).try_init();

    let model = le_model(
        Sense::Max,
        vec![3.0, 5.0],
        vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 2.0]],
        vec![4.0, 12.0, 18.0],
    );

    let report = Solver::new().solve_and_analyze(&model, Strategy::Analytic).unwrap();

    assert!((report.solution.values[0] - 2.0).abs() < 1e-9);
    assert!((report.solution.values[1] - 6.0).abs() < 1e-9);
    assert!((report.solution.objective_value - 36.0).abs() < 1e-9);

    let prices: Vec<f64> = report
        .constraints
        .iter()
        .map(|c| c.shadow_price.value().unwrap())
        .collect();
    assert_eq!(prices[0], 0.0, "constraint 1 is slack");
    assert!(prices[1] > 0.0 && prices[2] > 0.0, "constraints 2 and 3 are tight: {:?}", prices);
}

#[test]
fn infeasible_single_constraint() {
    let _ = env_logger::builder().is_test(true).try_init();

    let model = le_model(Sense::Max, vec![1.0], vec![vec![1.0]], vec![-1.0]);

    let (solution, basis) = Solver::new().solve_with_basis(&model);

    assert_eq!(solution.status, SolutionStatus::Infeasible);
    assert!(solution.values.is_empty());
    assert!(basis.is_none());
}

#[test]
fn unbounded_without_constraints() {
    let model = le_model(Sense::Max, vec![1.0], vec![], vec![]);

    let solution = Solver::new().solve(&model);

    assert_eq!(solution.status, SolutionStatus::Unbounded);
}

#[test]
fn zero_coefficient_is_safe_on_both_paths() {
    let model = le_model(
        Sense::Max,
        vec![0.0, 2.0],
        vec![vec![1.0, 1.0], vec![1.0, 0.0]],
        vec![5.0, 3.0],
    );
    let solver = Solver::new();

    let analytic = solver.solve_and_analyze(&model, Strategy::Analytic).unwrap();
    for v in &analytic.variables {
        let range = v.coefficient_range().unwrap();
        assert!(range.lower != Bound::Unavailable && range.upper != Bound::Unavailable);
        assert!(v.reduced_cost().unwrap().is_finite());
    }

    let perturbed = solver.solve_and_analyze(&model, Strategy::perturbation()).unwrap();
    match perturbed.variables[0].measure {
        VariableMeasure::Perturbation(p) => assert_eq!(p.relative_change, Bound::Finite(0.0)),
        _ => panic!("expected perturbation measure"),
    }
}

#[test]
fn solver_is_shareable_across_threads() {
    let solver = Solver::new();
    let model = le_model(
        Sense::Max,
        vec![3.0, 5.0],
        vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 2.0]],
        vec![4.0, 12.0, 18.0],
    );

    let results: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| solver.solve(&model).objective_value))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|&z| z == results[0]));
}
