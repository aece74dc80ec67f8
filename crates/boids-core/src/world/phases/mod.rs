mod agents;
mod prune;
