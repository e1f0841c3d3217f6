//! Input validation for rescue problems.
//!
//! Checks the structural integrity of a problem instance before the GA
//! runs. Detects:
//! - Missing robots or an empty population
//! - Robot starts outside the grid or on debris
//! - Duplicate survivor ids, or ids that do not index the survivor list
//! - Survivors outside the grid or on debris
//!
//! Robots sharing a start cell are legal; fitness penalizes them.

use std::collections::HashSet;

use crate::models::{Node, Survivor};
use crate::world::WorldModel;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No robot start cells were given.
    NoRobots,
    /// A robot starts outside the grid.
    RobotOutOfBounds,
    /// A robot starts on an obstacle.
    RobotOnObstacle,
    /// Two survivors share an id.
    DuplicateSurvivorId,
    /// A survivor's id does not equal its index in the list.
    NonSequentialSurvivorId,
    /// A survivor lies outside the grid.
    SurvivorOutOfBounds,
    /// A survivor lies on an obstacle.
    SurvivorOnObstacle,
    /// The GA population size is zero.
    EmptyPopulation,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a rescue problem.
///
/// Checks:
/// 1. At least one robot
/// 2. Every robot start is in bounds and free
/// 3. Survivor ids are unique and survivor `i` has id `i`
/// 4. Every survivor is in bounds and free
/// 5. Population size is positive
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(
    world: &dyn WorldModel,
    starts: &[Node],
    survivors: &[Survivor],
    population_size: usize,
) -> ValidationResult {
    let mut errors = Vec::new();

    if starts.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoRobots,
            "At least one robot is required",
        ));
    }

    for (r, &start) in starts.iter().enumerate() {
        if !world.in_bounds(start) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RobotOutOfBounds,
                format!("Robot {r} starts outside the grid at {start}"),
            ));
        } else if world.cell_obstacle(start) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RobotOnObstacle,
                format!("Robot {r} starts on an obstacle at {start}"),
            ));
        }
    }

    let mut seen = HashSet::new();
    for (index, survivor) in survivors.iter().enumerate() {
        if !seen.insert(survivor.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateSurvivorId,
                format!("Duplicate survivor id: {}", survivor.id),
            ));
        } else if survivor.id != index {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonSequentialSurvivorId,
                format!("Survivor at index {index} has id {}", survivor.id),
            ));
        }
        let pos = survivor.position;
        if !world.in_bounds(pos) {
            errors.push(ValidationError::new(
                ValidationErrorKind::SurvivorOutOfBounds,
                format!("Survivor {} lies outside the grid at {pos}", survivor.id),
            ));
        } else if world.cell_obstacle(pos) {
            errors.push(ValidationError::new(
                ValidationErrorKind::SurvivorOnObstacle,
                format!("Survivor {} lies on an obstacle at {pos}", survivor.id),
            ));
        }
    }

    if population_size == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyPopulation,
            "Population size must be positive",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
