use super::*;

impl Packer {
    /// Computes volume and utilization statistics for the placed part of a solution.
    pub(super) fn calculate_summary(&self, solution: &Solution) -> Summary {
        let container_volume = self.container.volume();
        let used_volume = solution.used_volume();
        let utilization_percentage = if container_volume > 0.0 {
            (used_volume / container_volume) * 100.0
        } else {
            0.0
        };

        let max_stack_height = solution
            .placed_boxes()
            .iter()
            .map(|bx| bx.max_corner().z)
            .fold(0.0, f64::max);

        Summary {
            total_boxes: solution.boxes.len(),
            placed_boxes: solution.placed,
            container_volume,
            used_volume,
            utilization_percentage,
            max_stack_height,
        }
    }
}
