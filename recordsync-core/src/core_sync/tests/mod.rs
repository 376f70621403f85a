/*
    Scenario tests for the core_sync subsystem

    Test suite covering:
    - Store -> document -> store convergence
    - Coordinator startup, loop suppression and teardown
    - Edge cases of patch interpretation and reconciliation
*/
