use crate::agent::Agent;
use crate::config::SimConfig;
use crate::food::FoodItem;
use crate::nav::Nav;
use crate::spatial::AnyIndex;
use rand_chacha::ChaCha12Rng;

use super::super::World;

/// Read-only state shared by every agent during one tick.
struct TickContext<'a> {
    navs: &'a [Nav],
    agent_index: &'a AnyIndex,
    food_index: &'a AnyIndex,
    food: &'a [FoodItem],
    config: &'a SimConfig,
}

impl TickContext<'_> {
    fn update(&self, agent: &mut Agent, rng: &mut ChaCha12Rng) {
        if !agent.alive {
            return;
        }
        let config = self.config;
        agent.detect_surroundings(
            self.agent_index,
            config.world_size,
            self.navs,
            &config.behavior,
            rng,
        );
        agent.find_food(self.food_index, config.world_size, self.food, &config.behavior);
        agent.update_params();
        agent.update_position(config.speed, config.dt);
    }
}

impl World {
    /// Sense, forage, age and move every live agent.
    ///
    /// Agents only read `nav_snapshot` and the indices built from it, so the
    /// order in which slots are visited (or whether they run in parallel)
    /// cannot change the result.
    pub(in crate::world) fn step_agent_phase(&mut self) {
        let ctx = TickContext {
            navs: &self.nav_snapshot,
            agent_index: &self.agent_index,
            food_index: &self.food_index,
            food: &self.food,
            config: &self.config,
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.agents
                .par_iter_mut()
                .zip(self.agent_rngs.par_iter_mut())
                .for_each(|(agent, rng)| ctx.update(agent, rng));
        }

        #[cfg(not(feature = "parallel"))]
        for (agent, rng) in self.agents.iter_mut().zip(self.agent_rngs.iter_mut()) {
            ctx.update(agent, rng);
        }
    }
}
