use super::super::World;
use tracing::debug;

impl World {
    /// Drop agents that died last tick, keeping `agents` and `agent_rngs` aligned.
    pub(in crate::world) fn step_prune_phase(&mut self) {
        if self.agents.iter().all(|a| a.alive) {
            return;
        }
        let before = self.agents.len();
        let old_agents = std::mem::take(&mut self.agents);
        let old_rngs = std::mem::take(&mut self.agent_rngs);
        for (agent, rng) in old_agents.into_iter().zip(old_rngs) {
            if agent.alive {
                self.agents.push(agent);
                self.agent_rngs.push(rng);
            }
        }
        debug!(
            step = self.step_index,
            removed = before - self.agents.len(),
            "pruned dead agents"
        );
    }
}
