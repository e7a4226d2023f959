mod failover;
